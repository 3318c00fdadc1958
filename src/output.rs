//! Output formatting module.
//!
//! Renders check verdicts, connection reports and policies as styled plain
//! text or JSON.

use crate::cli::OutputFormat;
use crate::config::PolicyFile;
use crate::error::{DialError, DialErrorKind};
use console::style;
use serde::Serialize;
use std::io::{self, Write};
use std::net::{IpAddr, SocketAddr};

/// Result of `guarddial check`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub transport: String,
    pub address: String,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<DialErrorKind>,
    /// Rule that matched, for blocked addresses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckReport {
    /// Report for a refused or failed check.
    pub fn denied(transport: &str, address: &str, err: &DialError) -> Self {
        let rule = match err {
            DialError::BlockedRange { reason, .. } => Some(reason.to_string()),
            _ => None,
        };
        Self {
            transport: transport.to_string(),
            address: address.to_string(),
            allowed: false,
            port: None,
            candidates: Vec::new(),
            kind: Some(err.kind()),
            rule,
            error: Some(err.to_string()),
        }
    }
}

/// Result of `guarddial connect`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectReport {
    pub address: String,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<SocketAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<SocketAddr>,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<DialErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    println!("{}", json);
    Ok(())
}

/// Print a check verdict.
pub fn print_check(report: &CheckReport, format: OutputFormat) -> io::Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if report.allowed {
        writeln!(
            out,
            "{} {} over {}",
            style("ALLOWED").green().bold(),
            style(&report.address).white().bold(),
            report.transport
        )?;
        for ip in &report.candidates {
            writeln!(out, "  {} {}", style("•").dim(), ip)?;
        }
    } else {
        writeln!(
            out,
            "{} {}",
            style("DENIED").red().bold(),
            style(&report.address).white().bold()
        )?;
        if let Some(error) = &report.error {
            writeln!(out, "  {} {}", style("reason:").bold(), error)?;
        }
        if let Some(rule) = &report.rule {
            writeln!(out, "  {} {}", style("rule:").bold(), style(rule).yellow())?;
        }
    }

    Ok(())
}

/// Print the outcome of a connection attempt.
pub fn print_connect(report: &ConnectReport, format: OutputFormat) -> io::Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match (&report.peer, &report.error) {
        (Some(peer), _) => {
            writeln!(
                out,
                "{} {} ({}) in {}ms",
                style("Connected").green().bold(),
                style(&report.address).white().bold(),
                peer,
                report.elapsed_ms
            )?;
            if let Some(local) = &report.local {
                writeln!(out, "  {} {}", style("local:").bold(), local)?;
            }
            match &report.response {
                Some(response) => {
                    writeln!(out, "  {} {}", style("response:").bold(), style(response).dim())?
                }
                None => writeln!(out, "  {}", style("no response").dim())?,
            }
        }
        (None, Some(error)) => {
            writeln!(
                out,
                "{} {}",
                style("Failed").red().bold(),
                style(&report.address).white().bold()
            )?;
            writeln!(out, "  {} {}", style("reason:").bold(), error)?;
        }
        (None, None) => {}
    }

    Ok(())
}

/// Print a policy; always JSON, since that is the policy file format.
pub fn print_policy(policy: &PolicyFile) -> io::Result<()> {
    print_json(policy)
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}
