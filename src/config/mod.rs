//! Configuration management for guarddial.
//!
//! Provides the immutable dial policy, its builder and built-in defaults,
//! JSON policy files, and XDG-compliant configuration paths.

mod file;
mod policy;
mod settings;

pub use file::PolicyFile;
pub use policy::{
    default_policy, BlockedAddressAction, PolicyBuilder, PolicyConfig,
    DEFAULT_ALLOWED_PORTS, DEFAULT_ALLOWED_TRANSPORTS, DEFAULT_BLOCKED_RANGES,
};
pub use settings::Paths;
