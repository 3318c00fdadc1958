//! Dial policy configuration.
//!
//! A [`PolicyConfig`] is built once through [`PolicyBuilder`] and never
//! mutated afterwards; callers needing a different policy build a new one.
//! It is cheap to share across tasks behind an `Arc`.

use crate::error::PolicyError;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::time::Instant;

/// Transports allowed by the default policy.
pub const DEFAULT_ALLOWED_TRANSPORTS: [&str; 1] = ["tcp"];

/// Ports allowed by the default policy: HTTP, HTTPS and their common alternates.
pub const DEFAULT_ALLOWED_PORTS: [u16; 4] = [80, 443, 8080, 8443];

/// Reserved ranges blocked by the default policy.
///
/// From the IANA special-purpose address registries.
pub const DEFAULT_BLOCKED_RANGES: [&str; 28] = [
    "0.0.0.0/8",
    "10.0.0.0/8",
    "100.64.0.0/10",
    "127.0.0.0/8",
    "169.254.0.0/16",
    "172.16.0.0/12",
    "192.0.0.0/24",
    "192.0.2.0/24",
    "192.88.99.0/24",
    "192.168.0.0/16",
    "198.18.0.0/15",
    "198.51.100.0/24",
    "203.0.113.0/24",
    "224.0.0.0/4",
    "240.0.0.0/4",
    "255.255.255.255/32",
    "::/128",
    "::1/128",
    "100::/64",
    "64:ff9b::/96",
    "2001::/32",
    "2001:10::/28",
    "2001:20::/28",
    "2001:db8::/32",
    "2002::/16",
    "fc00::/7",
    "fe80::/10",
    "ff00::/8",
];

static DEFAULT_POLICY: LazyLock<Result<Arc<PolicyConfig>, PolicyError>> =
    LazyLock::new(|| PolicyConfig::http_default().map(Arc::new));

/// The built-in HTTP policy, constructed once and shared.
pub fn default_policy() -> Result<Arc<PolicyConfig>, PolicyError> {
    DEFAULT_POLICY.as_ref().map(Arc::clone).map_err(Clone::clone)
}

/// What to do when a name resolves to a mix of allowed and blocked addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockedAddressAction {
    /// Refuse the whole dial if any resolved address is blocked.
    #[default]
    RejectHost,
    /// Drop blocked addresses and dial the remaining ones.
    SkipAddress,
}

/// Immutable allow/deny rules plus the dial parameters carried to the connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    pub(crate) allowed_transports: BTreeSet<String>,
    pub(crate) allowed_ports: BTreeSet<u16>,
    pub(crate) blocked_ranges: Vec<IpNetwork>,
    pub(crate) block_private: bool,
    pub(crate) block_link_local: bool,
    pub(crate) block_multicast: bool,
    pub(crate) block_unspecified: bool,
    pub(crate) on_blocked_address: BlockedAddressAction,
    pub(crate) timeout: Option<Duration>,
    pub(crate) deadline: Option<Instant>,
    pub(crate) keep_alive: Option<Duration>,
    pub(crate) local_address: Option<SocketAddr>,
}

impl PolicyConfig {
    /// Start building a policy. Nothing is allowed until added.
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// The policy designed for HTTP clients: tcp only, ports 80/443/8080/8443,
    /// every reserved range and every classification flag blocked.
    pub fn http_default() -> Result<Self, PolicyError> {
        Self::builder()
            .allow_transports(DEFAULT_ALLOWED_TRANSPORTS)
            .allow_ports(DEFAULT_ALLOWED_PORTS)
            .block_ranges(DEFAULT_BLOCKED_RANGES)
            .block_all_classes()
            .build()
    }

    /// A builder pre-filled with this policy, for deriving a new one.
    pub fn to_builder(&self) -> PolicyBuilder {
        PolicyBuilder {
            allowed_transports: self.allowed_transports.clone(),
            allowed_ports: self.allowed_ports.clone(),
            blocked_ranges: self.blocked_ranges.iter().map(|r| r.to_string()).collect(),
            block_private: self.block_private,
            block_link_local: self.block_link_local,
            block_multicast: self.block_multicast,
            block_unspecified: self.block_unspecified,
            on_blocked_address: self.on_blocked_address,
            timeout: self.timeout,
            deadline: self.deadline,
            keep_alive: self.keep_alive,
            local_address: self.local_address,
        }
    }

    pub fn allowed_transports(&self) -> &BTreeSet<String> {
        &self.allowed_transports
    }

    pub fn allowed_ports(&self) -> &BTreeSet<u16> {
        &self.allowed_ports
    }

    /// Blocked ranges in the order they were configured.
    pub fn blocked_ranges(&self) -> &[IpNetwork] {
        &self.blocked_ranges
    }

    pub fn blocks_private(&self) -> bool {
        self.block_private
    }

    pub fn blocks_link_local(&self) -> bool {
        self.block_link_local
    }

    pub fn blocks_multicast(&self) -> bool {
        self.block_multicast
    }

    pub fn blocks_unspecified(&self) -> bool {
        self.block_unspecified
    }

    pub fn on_blocked_address(&self) -> BlockedAddressAction {
        self.on_blocked_address
    }

    /// Relative bound on a whole dial, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Absolute cutoff for any dial, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Keep-alive period for established connections; `None` leaves it disabled.
    pub fn keep_alive(&self) -> Option<Duration> {
        self.keep_alive
    }

    /// Local address to bind before connecting.
    pub fn local_address(&self) -> Option<SocketAddr> {
        self.local_address
    }
}

/// Builder for [`PolicyConfig`].
///
/// CIDR ranges are kept as text until [`PolicyBuilder::build`], which reports
/// the first malformed one instead of panicking.
#[derive(Debug, Clone, Default)]
pub struct PolicyBuilder {
    allowed_transports: BTreeSet<String>,
    allowed_ports: BTreeSet<u16>,
    blocked_ranges: Vec<String>,
    block_private: bool,
    block_link_local: bool,
    block_multicast: bool,
    block_unspecified: bool,
    on_blocked_address: BlockedAddressAction,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    keep_alive: Option<Duration>,
    local_address: Option<SocketAddr>,
}

impl PolicyBuilder {
    pub fn allow_transport(mut self, transport: impl Into<String>) -> Self {
        self.allowed_transports.insert(transport.into());
        self
    }

    pub fn allow_transports<I, S>(mut self, transports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_transports
            .extend(transports.into_iter().map(Into::into));
        self
    }

    pub fn allow_port(mut self, port: u16) -> Self {
        self.allowed_ports.insert(port);
        self
    }

    pub fn allow_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.allowed_ports.extend(ports);
        self
    }

    /// Replace the allowed port set.
    pub fn set_allowed_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.allowed_ports = ports.into_iter().collect();
        self
    }

    pub fn block_range(mut self, cidr: impl Into<String>) -> Self {
        self.blocked_ranges.push(cidr.into());
        self
    }

    pub fn block_ranges<I, S>(mut self, ranges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_ranges.extend(ranges.into_iter().map(Into::into));
        self
    }

    pub fn block_private(mut self, enabled: bool) -> Self {
        self.block_private = enabled;
        self
    }

    pub fn block_link_local(mut self, enabled: bool) -> Self {
        self.block_link_local = enabled;
        self
    }

    pub fn block_multicast(mut self, enabled: bool) -> Self {
        self.block_multicast = enabled;
        self
    }

    pub fn block_unspecified(mut self, enabled: bool) -> Self {
        self.block_unspecified = enabled;
        self
    }

    /// Enable every classification flag.
    pub fn block_all_classes(self) -> Self {
        self.block_private(true)
            .block_link_local(true)
            .block_multicast(true)
            .block_unspecified(true)
    }

    pub fn on_blocked_address(mut self, action: BlockedAddressAction) -> Self {
        self.on_blocked_address = action;
        self
    }

    /// Bound each dial by `timeout`. A zero duration means no timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Enable TCP keep-alive with this period. A zero duration disables it.
    pub fn keep_alive(mut self, period: Duration) -> Self {
        self.keep_alive = (!period.is_zero()).then_some(period);
        self
    }

    pub fn local_address(mut self, address: SocketAddr) -> Self {
        self.local_address = Some(address);
        self
    }

    /// Validate and freeze the policy.
    pub fn build(self) -> Result<PolicyConfig, PolicyError> {
        if let Some(bad) = self.allowed_transports.iter().find(|t| t.trim().is_empty()) {
            return Err(PolicyError::InvalidTransport(bad.clone()));
        }

        let blocked_ranges = self
            .blocked_ranges
            .iter()
            .map(|range| {
                range
                    .trim()
                    .parse::<IpNetwork>()
                    .map_err(|e| PolicyError::InvalidCidr {
                        range: range.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PolicyConfig {
            allowed_transports: self.allowed_transports,
            allowed_ports: self.allowed_ports,
            blocked_ranges,
            block_private: self.block_private,
            block_link_local: self.block_link_local,
            block_multicast: self.block_multicast,
            block_unspecified: self.block_unspecified,
            on_blocked_address: self.on_blocked_address,
            timeout: self.timeout,
            deadline: self.deadline,
            keep_alive: self.keep_alive,
            local_address: self.local_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_default_contents() {
        let policy = PolicyConfig::http_default().unwrap();

        assert_eq!(policy.allowed_transports().len(), 1);
        assert!(policy.allowed_transports().contains("tcp"));
        assert_eq!(
            policy.allowed_ports().iter().copied().collect::<Vec<_>>(),
            vec![80, 443, 8080, 8443]
        );
        assert_eq!(policy.blocked_ranges().len(), 28);
        assert_eq!(policy.blocked_ranges()[0].to_string(), "0.0.0.0/8");
        assert_eq!(policy.blocked_ranges()[27].to_string(), "ff00::/8");
        assert!(policy.blocks_private());
        assert!(policy.blocks_link_local());
        assert!(policy.blocks_multicast());
        assert!(policy.blocks_unspecified());
        assert_eq!(policy.on_blocked_address(), BlockedAddressAction::RejectHost);
        assert_eq!(policy.timeout(), None);
        assert_eq!(policy.deadline(), None);
    }

    #[test]
    fn test_default_policy_is_shared() {
        let a = default_policy().unwrap();
        let b = default_policy().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_invalid_cidr_is_an_error() {
        let err = PolicyConfig::builder()
            .block_range("10.0.0.0/8")
            .block_range("10.0.0.0/33")
            .build()
            .unwrap_err();

        assert!(matches!(err, PolicyError::InvalidCidr { ref range, .. } if range == "10.0.0.0/33"));
    }

    #[test]
    fn test_empty_transport_is_an_error() {
        let err = PolicyConfig::builder().allow_transport(" ").build().unwrap_err();
        assert_eq!(err, PolicyError::InvalidTransport(" ".to_string()));
    }

    #[test]
    fn test_empty_builder_fails_closed() {
        let policy = PolicyConfig::builder().build().unwrap();
        assert!(policy.allowed_ports().is_empty());
        assert!(policy.allowed_transports().is_empty());
    }

    #[test]
    fn test_zero_durations_mean_unset() {
        let policy = PolicyConfig::builder()
            .timeout(Duration::ZERO)
            .keep_alive(Duration::ZERO)
            .build()
            .unwrap();
        assert_eq!(policy.timeout(), None);
        assert_eq!(policy.keep_alive(), None);
    }

    #[test]
    fn test_to_builder_round_trip() {
        let policy = PolicyConfig::http_default().unwrap();
        let derived = policy
            .to_builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(derived.blocked_ranges(), policy.blocked_ranges());
        assert_eq!(derived.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(policy.timeout(), None);
    }
}
