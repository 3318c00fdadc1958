//! # guarddial - SSRF-safe outbound connections
//!
//! guarddial replaces a plain "connect to host:port" call with one that
//! refuses to reach loopback, private, link-local, multicast, unspecified or
//! operator-listed address ranges, and ports outside an allow-list. Every
//! check runs before a socket is opened, and IP literals in any legacy
//! encoding (`0x7f000001`, `2130706433`, `127.1`) are normalized first.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use guarddial::{GuardedDialer, PolicyConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Refused before any DNS traffic or connect.
//!     let err = guarddial::dial("tcp", "127.0.0.1:80").await.unwrap_err();
//!     assert!(err.to_string().contains("blocked range"));
//!
//!     let policy = PolicyConfig::http_default()?
//!         .to_builder()
//!         .timeout(std::time::Duration::from_secs(10))
//!         .build()?;
//!     let dialer = GuardedDialer::new(Arc::new(policy));
//!     let stream = dialer.dial("tcp", "example.org:443").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Address splitting, IP literal parsing and port lists
//! - [`config`] - The immutable policy, its builder and JSON policy files
//! - [`policy`] - Pure transport, port and address predicates
//! - [`resolve`] - Host and service-name resolution
//! - [`dialer`] - Pre-flight validation and serial multi-address connect
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod dialer;
pub mod error;
pub mod output;
pub mod policy;
pub mod preview;
pub mod resolve;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use config::{default_policy, BlockedAddressAction, PolicyBuilder, PolicyConfig};
pub use dialer::{dial, Connect, DialRequest, GuardedDialer, SerialConnector, TcpConnector};
pub use error::{DialError, DialErrorKind, PolicyError};
pub use policy::BlockReason;
pub use resolve::{HostResolver, LookupError, StaticResolver, SystemResolver};
