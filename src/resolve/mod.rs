//! Host and port resolution.
//!
//! [`HostResolver`] is the seam to DNS: the dialer treats it as a black box
//! that yields addresses or fails. [`SystemResolver`] is the production
//! implementation on top of trust-dns; [`StaticResolver`] pins names to fixed
//! addresses.

mod port;

pub use port::resolve_port;

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::OnceLock;
use tracing::{debug, warn};
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::TokioAsyncResolver;

/// Error returned by a [`HostResolver`].
///
/// The text mirrors the classic `lookup <host>: no such host` form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("lookup {host}: no such host")]
    NotFound { host: String },
    #[error("lookup {host}: i/o timeout")]
    Timeout { host: String },
    #[error("lookup {host}: {reason}")]
    Failed { host: String, reason: String },
}

impl LookupError {
    fn from_resolve(host: &str, err: &ResolveError) -> Self {
        match err.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => Self::NotFound {
                host: host.to_string(),
            },
            ResolveErrorKind::Timeout => Self::Timeout {
                host: host.to_string(),
            },
            _ => Self::Failed {
                host: host.to_string(),
                reason: err.to_string(),
            },
        }
    }
}

/// Resolves a host name to its addresses, in preference order.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, LookupError>;
}

/// Resolver backed by trust-dns with the system configuration.
///
/// The underlying resolver is built on first use, so constructing a
/// `SystemResolver` is free and does not need a running runtime.
#[derive(Default)]
pub struct SystemResolver {
    inner: OnceLock<TokioAsyncResolver>,
}

impl SystemResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolver(&self) -> &TokioAsyncResolver {
        self.inner.get_or_init(|| {
            TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
                warn!(error = %e, "system resolver configuration unavailable, using defaults");
                TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
            })
        })
    }
}

#[async_trait]
impl HostResolver for SystemResolver {
    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, LookupError> {
        if host.is_empty() {
            return Err(LookupError::NotFound {
                host: host.to_string(),
            });
        }

        let response = self.resolver().lookup_ip(host).await.map_err(|e| {
            debug!(host, error = %e, "lookup failed");
            LookupError::from_resolve(host, &e)
        })?;

        Ok(response.iter().collect())
    }
}

/// Resolver answering from a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `host` to `addrs` (in that order). Names are matched case-insensitively.
    pub fn with_host(mut self, host: &str, addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        self.hosts
            .insert(host.to_ascii_lowercase(), addrs.into_iter().collect());
        self
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, LookupError> {
        self.hosts
            .get(&host.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| LookupError::NotFound {
                host: host.to_string(),
            })
    }
}
