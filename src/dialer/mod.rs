//! Guarded dialing.
//!
//! [`GuardedDialer::dial`] validates a request against the policy before any
//! socket is opened, then hands the surviving candidates to the
//! [`SerialConnector`]. The steps run strictly in order and each fails fast:
//!
//! 1. transport is allow-listed
//! 2. address splits into host and port
//! 3. port text resolves to a number
//! 4. port is allow-listed (before any DNS traffic)
//! 5. host resolves to candidates (IP literals skip the resolver), keeping
//!    only the address family a `*4`/`*6` transport is pinned to
//! 6. every candidate passes the address policy
//! 7. candidates are dialed one by one

mod connect;
mod serial;

pub use connect::{family_matches, AttemptOptions, Connect, TcpConnector};
pub use serial::{SerialConnector, TimeBudget, MIN_ATTEMPT_TIMEOUT};

use crate::config::{default_policy, BlockedAddressAction, PolicyConfig};
use crate::error::DialError;
use crate::resolve::{resolve_port, HostResolver, LookupError, SystemResolver};
use crate::services::{ServiceLookup, ServiceTable};
use crate::types::{canonical_ip, split_host_port, Host};
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::time::timeout_at;
use tracing::debug;

/// A request that passed every pre-flight check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialRequest {
    /// Transport the dial runs over.
    pub transport: String,
    /// The address as given by the caller.
    pub address: String,
    /// Host part of the address.
    pub host: String,
    /// Numeric port.
    pub port: u16,
    /// Addresses to try, in resolution order.
    pub candidates: Vec<IpAddr>,
}

/// A dialer that refuses forbidden transports, ports and addresses.
///
/// Cheap to share: the policy is behind an `Arc` and never mutated, so many
/// dials may run against one dialer concurrently.
pub struct GuardedDialer<R = SystemResolver, C = TcpConnector> {
    policy: Arc<PolicyConfig>,
    resolver: R,
    connector: SerialConnector<C>,
    services: Arc<dyn ServiceLookup>,
}

impl GuardedDialer {
    /// A TCP dialer for `policy` using the system resolver and services table.
    pub fn new(policy: Arc<PolicyConfig>) -> Self {
        Self {
            policy,
            resolver: SystemResolver::new(),
            connector: SerialConnector::new(TcpConnector::new()),
            services: ServiceTable::system(),
        }
    }
}

impl<R, C> GuardedDialer<R, C> {
    /// Replace the host resolver.
    pub fn with_resolver<R2>(self, resolver: R2) -> GuardedDialer<R2, C> {
        GuardedDialer {
            policy: self.policy,
            resolver,
            connector: self.connector,
            services: self.services,
        }
    }

    /// Replace the socket connector.
    pub fn with_connector<C2>(self, connector: C2) -> GuardedDialer<R, C2> {
        GuardedDialer {
            policy: self.policy,
            resolver: self.resolver,
            connector: SerialConnector::new(connector),
            services: self.services,
        }
    }

    /// Replace the service-name table used for symbolic ports.
    pub fn with_services(mut self, services: Arc<dyn ServiceLookup>) -> Self {
        self.services = services;
        self
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    fn attempt_options(&self) -> AttemptOptions {
        AttemptOptions {
            keep_alive: self.policy.keep_alive(),
            local_address: self.policy.local_address(),
        }
    }
}

impl<R: HostResolver, C: Connect> GuardedDialer<R, C> {
    /// Connect to `address` over `transport` if the policy allows it.
    pub async fn dial(&self, transport: &str, address: &str) -> Result<C::Stream, DialError> {
        let budget = TimeBudget::start(self.policy.timeout(), self.policy.deadline());
        let request = self.preflight(transport, address, budget).await?;
        self.connector
            .connect_any(&request, budget, &self.attempt_options())
            .await
    }

    /// Run every check `dial` runs, including resolution, without connecting.
    pub async fn authorize(&self, transport: &str, address: &str) -> Result<DialRequest, DialError> {
        let budget = TimeBudget::start(self.policy.timeout(), self.policy.deadline());
        self.preflight(transport, address, budget).await
    }

    async fn preflight(
        &self,
        transport: &str,
        address: &str,
        budget: TimeBudget,
    ) -> Result<DialRequest, DialError> {
        if !self.policy.is_transport_allowed(transport) {
            debug!(transport, address, "rejected transport");
            return Err(DialError::InvalidTransport {
                transport: transport.to_string(),
            });
        }

        let (host, port_text) = split_host_port(address)?;
        let port = resolve_port(transport, port_text, self.services.as_ref())?;

        if !self.policy.is_port_allowed(port) {
            debug!(address, port, "rejected port");
            return Err(DialError::BlockedPort {
                address: address.to_string(),
                port,
            });
        }

        let resolved = match Host::parse(host) {
            Host::Ip(ip) => vec![ip],
            Host::Name(name) => self.lookup(&name, budget).await?,
        };

        let found = resolved.len();
        let resolved: Vec<IpAddr> = resolved
            .into_iter()
            .map(canonical_ip)
            .filter(|ip| family_matches(transport, *ip))
            .collect();
        if found > 0 && resolved.is_empty() {
            debug!(transport, address, "no address of the requested family");
            return Err(DialError::NoAddresses {
                address: address.to_string(),
            });
        }

        let candidates = self.screen(address, resolved)?;

        Ok(DialRequest {
            transport: transport.to_string(),
            address: address.to_string(),
            host: host.to_string(),
            port,
            candidates,
        })
    }

    async fn lookup(&self, host: &str, budget: TimeBudget) -> Result<Vec<IpAddr>, LookupError> {
        match budget.deadline() {
            Some(deadline) => timeout_at(deadline, self.resolver.lookup_ip(host))
                .await
                .unwrap_or_else(|_| {
                    Err(LookupError::Timeout {
                        host: host.to_string(),
                    })
                }),
            None => self.resolver.lookup_ip(host).await,
        }
    }

    /// Apply the address policy to every resolved address.
    fn screen(&self, address: &str, resolved: Vec<IpAddr>) -> Result<Vec<IpAddr>, DialError> {
        let mut candidates = Vec::with_capacity(resolved.len());
        let mut first_blocked = None;

        for ip in resolved.into_iter().map(canonical_ip) {
            match self.policy.blocked_by(ip) {
                None => candidates.push(ip),
                Some(reason) => {
                    debug!(address, %ip, %reason, "rejected address");
                    let err = DialError::BlockedRange {
                        address: address.to_string(),
                        ip,
                        reason,
                    };
                    if self.policy.on_blocked_address() == BlockedAddressAction::RejectHost {
                        return Err(err);
                    }
                    first_blocked.get_or_insert(err);
                }
            }
        }

        match first_blocked {
            Some(err) if candidates.is_empty() => Err(err),
            _ => Ok(candidates),
        }
    }
}

/// Connect using the built-in HTTP policy.
///
/// Builds a fresh resolver for each call; long-lived callers should keep a
/// [`GuardedDialer`] around instead.
pub async fn dial(transport: &str, address: &str) -> Result<TcpStream, DialError> {
    GuardedDialer::new(default_policy()?)
        .dial(transport, address)
        .await
}
