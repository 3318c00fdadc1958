//! JSON policy files.
//!
//! A policy file overrides the built-in HTTP policy field by field; anything
//! left out keeps the default value.
//!
//! ```json
//! {
//!   "allowed_ports": [443],
//!   "blocked_ranges": ["10.0.0.0/8", "fd00::/8"],
//!   "timeout_ms": 10000
//! }
//! ```

use super::policy::{
    BlockedAddressAction, PolicyConfig, DEFAULT_ALLOWED_PORTS, DEFAULT_ALLOWED_TRANSPORTS,
    DEFAULT_BLOCKED_RANGES,
};
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Serialized form of a [`PolicyConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyFile {
    pub allowed_transports: Vec<String>,
    pub allowed_ports: Vec<u16>,
    pub blocked_ranges: Vec<String>,
    pub block_private: bool,
    pub block_link_local: bool,
    pub block_multicast: bool,
    pub block_unspecified: bool,
    pub on_blocked_address: BlockedAddressAction,
    /// Whole-dial timeout in milliseconds, 0 for none.
    pub timeout_ms: u64,
    /// Keep-alive period in milliseconds, 0 to disable.
    pub keep_alive_ms: u64,
    /// Local address to bind, e.g. "192.0.2.10:0".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_address: Option<String>,
}

impl Default for PolicyFile {
    fn default() -> Self {
        Self {
            allowed_transports: DEFAULT_ALLOWED_TRANSPORTS.iter().map(|t| t.to_string()).collect(),
            allowed_ports: DEFAULT_ALLOWED_PORTS.to_vec(),
            blocked_ranges: DEFAULT_BLOCKED_RANGES.iter().map(|r| r.to_string()).collect(),
            block_private: true,
            block_link_local: true,
            block_multicast: true,
            block_unspecified: true,
            on_blocked_address: BlockedAddressAction::RejectHost,
            timeout_ms: 0,
            keep_alive_ms: 0,
            local_address: None,
        }
    }
}

impl PolicyFile {
    /// Load a policy file from disk.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }

    /// Load a policy file and build the policy it describes.
    pub fn load_policy(path: impl AsRef<Path>) -> ConfigResult<PolicyConfig> {
        Self::load_from(path)?.try_into()
    }
}

impl From<&PolicyConfig> for PolicyFile {
    fn from(policy: &PolicyConfig) -> Self {
        Self {
            allowed_transports: policy.allowed_transports().iter().cloned().collect(),
            allowed_ports: policy.allowed_ports().iter().copied().collect(),
            blocked_ranges: policy.blocked_ranges().iter().map(|r| r.to_string()).collect(),
            block_private: policy.blocks_private(),
            block_link_local: policy.blocks_link_local(),
            block_multicast: policy.blocks_multicast(),
            block_unspecified: policy.blocks_unspecified(),
            on_blocked_address: policy.on_blocked_address(),
            timeout_ms: policy.timeout().map_or(0, |t| t.as_millis() as u64),
            keep_alive_ms: policy.keep_alive().map_or(0, |k| k.as_millis() as u64),
            local_address: policy.local_address().map(|a| a.to_string()),
        }
    }
}

impl TryFrom<PolicyFile> for PolicyConfig {
    type Error = ConfigError;

    fn try_from(file: PolicyFile) -> Result<Self, Self::Error> {
        let mut builder = PolicyConfig::builder()
            .allow_transports(file.allowed_transports)
            .allow_ports(file.allowed_ports)
            .block_ranges(file.blocked_ranges)
            .block_private(file.block_private)
            .block_link_local(file.block_link_local)
            .block_multicast(file.block_multicast)
            .block_unspecified(file.block_unspecified)
            .on_blocked_address(file.on_blocked_address)
            .timeout(Duration::from_millis(file.timeout_ms))
            .keep_alive(Duration::from_millis(file.keep_alive_ms));

        if let Some(local) = file.local_address {
            let addr: SocketAddr = local
                .parse()
                .map_err(|_| ConfigError::InvalidLocalAddress(local.clone()))?;
            builder = builder.local_address(addr);
        }

        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_file_matches_default_policy() {
        let policy = PolicyConfig::try_from(PolicyFile::default()).unwrap();
        assert_eq!(policy, PolicyConfig::http_default().unwrap());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file: PolicyFile =
            serde_json::from_str(r#"{ "allowed_ports": [443], "timeout_ms": 1500 }"#).unwrap();
        let policy = PolicyConfig::try_from(file).unwrap();

        assert_eq!(policy.allowed_ports().iter().copied().collect::<Vec<_>>(), vec![443]);
        assert_eq!(policy.timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(policy.blocked_ranges().len(), DEFAULT_BLOCKED_RANGES.len());
        assert!(policy.blocks_private());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result: Result<PolicyFile, _> = serde_json::from_str(r#"{ "allow_ports": [443] }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_range_in_file() {
        let file: PolicyFile =
            serde_json::from_str(r#"{ "blocked_ranges": ["not-a-cidr"] }"#).unwrap();
        let err = PolicyConfig::try_from(file).unwrap_err();
        assert!(matches!(err, ConfigError::Policy(_)));
    }

    #[test]
    fn test_bad_local_address_in_file() {
        let file: PolicyFile =
            serde_json::from_str(r#"{ "local_address": "nowhere" }"#).unwrap();
        let err = PolicyConfig::try_from(file).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLocalAddress(_)));
    }

    #[test]
    fn test_skip_address_action_parses() {
        let file: PolicyFile =
            serde_json::from_str(r#"{ "on_blocked_address": "skip-address" }"#).unwrap();
        assert_eq!(file.on_blocked_address, BlockedAddressAction::SkipAddress);
    }

    #[test]
    fn test_load_policy_from_disk() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmp,
            r#"{{ "allowed_transports": ["tcp", "tcp6"], "keep_alive_ms": 30000 }}"#
        )
        .unwrap();

        let policy = PolicyFile::load_policy(tmp.path()).unwrap();
        assert!(policy.allowed_transports().contains("tcp6"));
        assert_eq!(policy.keep_alive(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_missing_file() {
        let err = PolicyFile::load_from("/nonexistent/policy.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFailed { .. }));
    }

    #[test]
    fn test_export_matches_policy() {
        let policy = PolicyConfig::http_default().unwrap();
        let exported = PolicyFile::from(&policy);
        assert_eq!(exported, PolicyFile::default());
    }
}
