//! CLI subcommand definitions and handlers.
//!
//! Implements a git-like subcommand architecture:
//! - `guarddial check <address>` - Run every policy check without connecting
//! - `guarddial connect <address>` - Dial through the policy and preview the reply
//! - `guarddial policy` - Print the effective policy

mod check;
mod connect;
mod policy;

pub use check::CheckCommand;
pub use connect::ConnectCommand;
pub use policy::PolicyCommand;

use crate::config::{Paths, PolicyConfig, PolicyFile};
use crate::error::CliResult;
use crate::types::PortList;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// guarddial - dial network addresses through an SSRF guard.
///
/// Every dial is checked against an allow-list of transports and ports and a
/// deny-list of address ranges, both before and after name resolution.
#[derive(Parser, Debug)]
#[command(name = "guarddial")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Policy-checked outbound connections", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a JSON policy file
    #[arg(long, global = true, value_name = "PATH", env = "GUARDDIAL_POLICY")]
    pub policy: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, global = true, value_enum, default_value = "plain")]
    pub output: OutputFormat,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether an address may be dialed
    #[command(alias = "c")]
    Check(CheckCommand),

    /// Dial an address and show the first bytes of the reply
    Connect(ConnectCommand),

    /// Print the effective policy as JSON
    #[command(alias = "p")]
    Policy(PolicyCommand),
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Per-invocation adjustments layered over the loaded policy.
#[derive(Args, Debug, Clone, Default)]
pub struct PolicyOverrides {
    /// Replace the allowed ports (e.g. "443", "80,443,8000-8010")
    #[arg(long, value_name = "PORTS")]
    pub allow_ports: Option<PortList>,

    /// Bound the whole dial, resolution included, in milliseconds (0 = none)
    #[arg(short = 't', long, value_name = "MS")]
    pub timeout: Option<u64>,
}

impl PolicyOverrides {
    /// Derive a new policy from `base` with these overrides applied.
    pub fn apply(&self, base: &PolicyConfig) -> CliResult<PolicyConfig> {
        if self.allow_ports.is_none() && self.timeout.is_none() {
            return Ok(base.clone());
        }

        let mut builder = base.to_builder();
        if let Some(ports) = &self.allow_ports {
            builder = builder.set_allowed_ports(ports.iter());
        }
        if let Some(ms) = self.timeout {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        Ok(builder.build()?)
    }
}

/// Load the policy to run under.
///
/// An explicit path wins; otherwise the user's configuration directory is
/// consulted, and the built-in HTTP policy is the fallback.
pub fn load_policy(explicit: Option<&Path>) -> CliResult<PolicyConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => Paths::discover().ok().and_then(|p| p.existing_policy_file()),
    };

    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading policy file");
            Ok(PolicyFile::load_policy(&path)?)
        }
        None => Ok(PolicyConfig::http_default()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["guarddial", "check", "example.org:443", "-o", "json"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Check(cmd) => {
                assert_eq!(cmd.address, "example.org:443");
                assert_eq!(cmd.transport, "tcp");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_connect_options() {
        let cli = Cli::try_parse_from([
            "guarddial",
            "connect",
            "example.org:8000",
            "--allow-ports",
            "8000-8001",
            "--timeout",
            "1500",
            "--send",
            r"GET / HTTP/1.0\r\n\r\n",
        ])
        .unwrap();
        match cli.command {
            Commands::Connect(cmd) => {
                assert_eq!(cmd.overrides.timeout, Some(1500));
                assert_eq!(cmd.overrides.allow_ports.map(|p| p.len()), Some(2));
                assert!(cmd.send.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_connect_wait_defaults_to_preview_timeout() {
        let cli = Cli::try_parse_from(["guarddial", "connect", "example.org:80"]).unwrap();
        match cli.command {
            Commands::Connect(cmd) => {
                assert_eq!(
                    Duration::from_millis(cmd.wait),
                    crate::preview::PREVIEW_TIMEOUT
                );
                assert_eq!(cmd.transport, "tcp");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_port_list() {
        assert!(Cli::try_parse_from(["guarddial", "check", "a:1", "--allow-ports", "9-1"]).is_err());
    }

    #[test]
    fn test_overrides_apply() {
        let base = PolicyConfig::http_default().unwrap();

        let unchanged = PolicyOverrides::default().apply(&base).unwrap();
        assert_eq!(unchanged, base);

        let overrides = PolicyOverrides {
            allow_ports: Some("22".parse().unwrap()),
            timeout: Some(250),
        };
        let policy = overrides.apply(&base).unwrap();
        assert!(policy.is_port_allowed(22));
        assert!(!policy.is_port_allowed(443));
        assert_eq!(policy.timeout(), Some(Duration::from_millis(250)));
        assert_eq!(policy.blocked_ranges(), base.blocked_ranges());
    }

    #[test]
    fn test_load_policy_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"allowed_ports": [22]}}"#).unwrap();

        let policy = load_policy(Some(file.path())).unwrap();
        assert!(policy.is_port_allowed(22));
        assert!(!policy.is_port_allowed(80));
        assert!(policy.blocks_private());
    }

    #[test]
    fn test_load_policy_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_policy(Some(dir.path().join("absent.json").as_path())).is_err());
    }
}
