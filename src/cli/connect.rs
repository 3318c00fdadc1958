//! Connect subcommand implementation.
//!
//! Handles `guarddial connect <address>`: dials through the policy, optionally
//! writes a payload and shows the start of the reply.

use crate::cli::{OutputFormat, PolicyOverrides};
use crate::config::PolicyConfig;
use crate::dialer::GuardedDialer;
use crate::error::CliResult;
use crate::output::{self, ConnectReport};
use crate::preview::{read_preview, unescape_payload, PREVIEW_TIMEOUT};
use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Dial an address and show the first bytes of the reply.
#[derive(Parser, Debug)]
pub struct ConnectCommand {
    /// Address to dial, as host:port
    #[arg(value_name = "ADDRESS")]
    pub address: String,

    /// Transport to dial over
    #[arg(long, default_value = "tcp")]
    pub transport: String,

    /// Payload to send once connected; \r, \n and \t escapes are expanded
    #[arg(short, long, value_name = "TEXT")]
    pub send: Option<String>,

    /// How long to wait for the reply, in milliseconds
    #[arg(short, long, value_name = "MS", default_value_t = PREVIEW_TIMEOUT.as_millis() as u64)]
    pub wait: u64,

    #[command(flatten)]
    pub overrides: PolicyOverrides,
}

impl ConnectCommand {
    /// Execute the dial. Returns whether a connection was established.
    pub async fn execute(&self, base: &PolicyConfig, format: OutputFormat) -> CliResult<bool> {
        let policy = self.overrides.apply(base)?;
        let dialer = GuardedDialer::new(Arc::new(policy));
        let payload = self.send.as_deref().map(unescape_payload);

        let started = Instant::now();
        let report = match dialer.dial(&self.transport, &self.address).await {
            Ok(mut stream) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let response = read_preview(
                    &mut stream,
                    payload.as_deref(),
                    Duration::from_millis(self.wait),
                )
                .await;

                ConnectReport {
                    address: self.address.clone(),
                    connected: true,
                    peer: stream.peer_addr().ok(),
                    local: stream.local_addr().ok(),
                    elapsed_ms,
                    response,
                    kind: None,
                    error: None,
                }
            }
            Err(err) => ConnectReport {
                address: self.address.clone(),
                connected: false,
                peer: None,
                local: None,
                elapsed_ms: started.elapsed().as_millis() as u64,
                response: None,
                kind: Some(err.kind()),
                error: Some(err.to_string()),
            },
        };

        output::print_connect(&report, format)?;
        Ok(report.connected)
    }
}
