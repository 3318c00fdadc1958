//! Check subcommand implementation.
//!
//! Handles `guarddial check <address>`: runs the full pre-flight, name
//! resolution included, and reports the verdict without opening a socket.

use crate::cli::{OutputFormat, PolicyOverrides};
use crate::config::PolicyConfig;
use crate::dialer::GuardedDialer;
use crate::error::CliResult;
use crate::output::{self, CheckReport};
use clap::Parser;
use std::sync::Arc;

/// Check whether an address may be dialed.
#[derive(Parser, Debug)]
pub struct CheckCommand {
    /// Address to check, as host:port
    ///
    /// Examples:
    ///   example.org:443      Hostname and port
    ///   93.184.216.34:80     IPv4 literal
    ///   [2001:db8::1]:http   IPv6 literal with a service name
    #[arg(value_name = "ADDRESS")]
    pub address: String,

    /// Transport to check against the allow-list
    #[arg(long, default_value = "tcp")]
    pub transport: String,

    #[command(flatten)]
    pub overrides: PolicyOverrides,
}

impl CheckCommand {
    /// Execute the check. Returns whether the address is allowed.
    pub async fn execute(&self, base: &PolicyConfig, format: OutputFormat) -> CliResult<bool> {
        let policy = self.overrides.apply(base)?;
        let dialer = GuardedDialer::new(Arc::new(policy));

        let report = match dialer.authorize(&self.transport, &self.address).await {
            Ok(request) => CheckReport {
                transport: request.transport,
                address: request.address,
                allowed: true,
                port: Some(request.port),
                candidates: request.candidates,
                kind: None,
                rule: None,
                error: None,
            },
            Err(err) => CheckReport::denied(&self.transport, &self.address, &err),
        };

        output::print_check(&report, format)?;
        Ok(report.allowed)
    }
}
