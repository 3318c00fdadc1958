//! Error types for guarddial.
//!
//! Uses `thiserror` for ergonomic error definitions. The `Display` text of
//! [`DialError`] is stable: callers match on substrings such as
//! `blocked port`, `blocked range` and `no such host`.

use crate::policy::BlockReason;
use crate::resolve::LookupError;
use crate::types::AddressError;
use serde::Serialize;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`DialError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialErrorKind {
    InvalidTransport,
    InvalidAddressSyntax,
    InvalidPort,
    BlockedPort,
    ResolutionFailure,
    BlockedRange,
    ConnectionFailure,
    NoAddressesFound,
    Policy,
}

/// Main error type for dial operations.
///
/// Every variant is fatal for the call that produced it; nothing here is
/// retried automatically.
#[derive(Error, Debug)]
pub enum DialError {
    /// The transport is not in the allow-set.
    #[error("dial {transport}: transport not allowed")]
    InvalidTransport { transport: String },

    /// The address is not a valid `host:port` string.
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),

    /// The port is neither a decimal number in range nor a known service name.
    #[error("dial {transport}: invalid port {port:?}")]
    InvalidPort { transport: String, port: String },

    /// The port parsed fine but is not allow-listed.
    #[error("dial {address}: blocked port")]
    BlockedPort { address: String, port: u16 },

    /// Name resolution failed. The resolver's message is kept verbatim.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// A resolved address falls in a denied range or class.
    #[error("dial {address}: blocked range ({ip})")]
    BlockedRange {
        address: String,
        ip: IpAddr,
        reason: BlockReason,
    },

    /// Every candidate failed at the socket layer; carries the first failure.
    #[error("dial {transport} {target}: {source}")]
    Connect {
        transport: String,
        target: SocketAddr,
        source: io::Error,
    },

    /// Resolution succeeded but yielded no candidates.
    #[error("dial {address}: no IP addresses found")]
    NoAddresses { address: String },

    /// The built-in policy could not be constructed.
    #[error("default policy unavailable: {0}")]
    Policy(#[from] PolicyError),
}

impl DialError {
    /// Classify this error.
    pub fn kind(&self) -> DialErrorKind {
        match self {
            Self::InvalidTransport { .. } => DialErrorKind::InvalidTransport,
            Self::InvalidAddress(_) => DialErrorKind::InvalidAddressSyntax,
            Self::InvalidPort { .. } => DialErrorKind::InvalidPort,
            Self::BlockedPort { .. } => DialErrorKind::BlockedPort,
            Self::Lookup(_) => DialErrorKind::ResolutionFailure,
            Self::BlockedRange { .. } => DialErrorKind::BlockedRange,
            Self::Connect { .. } => DialErrorKind::ConnectionFailure,
            Self::NoAddresses { .. } => DialErrorKind::NoAddressesFound,
            Self::Policy(_) => DialErrorKind::Policy,
        }
    }

    /// True when the dial was refused by policy before any socket was opened.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self.kind(),
            DialErrorKind::InvalidTransport
                | DialErrorKind::BlockedPort
                | DialErrorKind::BlockedRange
        )
    }

    /// True when the failure was a timeout on the socket layer.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Connect { source, .. } if source.kind() == io::ErrorKind::TimedOut)
    }
}

/// Errors raised while constructing a policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid CIDR range {range:?}: {reason}")]
    InvalidCidr { range: String, reason: String },

    #[error("invalid transport name {0:?}")]
    InvalidTransport(String),
}

/// Errors raised while locating or reading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid policy file format: {0}")]
    InvalidFormat(String),

    #[error("invalid local address {0:?}")]
    InvalidLocalAddress(String),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced by the command-line front end.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Dial(#[from] DialError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for CLI handlers.
pub type CliResult<T> = Result<T, CliError>;
