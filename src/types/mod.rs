//! Core type definitions for addresses and port lists.
//!
//! Everything here is pure parsing: no lookups, no sockets.

mod address;
mod port;

pub use address::{canonical_ip, parse_ip_literal, split_host_port, AddressError, Host};
pub use port::{PortError, PortList};
