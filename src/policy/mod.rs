//! Address policy predicates.
//!
//! Pure checks over an immutable [`PolicyConfig`]: is this transport, port or
//! IP address allowed. No lookups and no side effects.

mod classify;

pub use classify::{
    is_interface_local_multicast, is_link_local_multicast, is_link_local_unicast, is_loopback,
    is_multicast, is_private, is_unspecified,
};

use crate::config::PolicyConfig;
use crate::types::canonical_ip;
use ipnetwork::IpNetwork;
use std::fmt;
use std::net::IpAddr;

/// Which rule rejected an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockReason {
    Private,
    Loopback,
    LinkLocal,
    Multicast,
    Unspecified,
    /// Contained in a configured range.
    Range(IpNetwork),
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => write!(f, "private"),
            Self::Loopback => write!(f, "loopback"),
            Self::LinkLocal => write!(f, "link-local"),
            Self::Multicast => write!(f, "multicast"),
            Self::Unspecified => write!(f, "unspecified"),
            Self::Range(range) => write!(f, "range {}", range),
        }
    }
}

impl PolicyConfig {
    /// Exact membership in the allowed transports.
    pub fn is_transport_allowed(&self, transport: &str) -> bool {
        self.allowed_transports.contains(transport)
    }

    /// Exact membership in the allowed ports. An empty set allows nothing.
    pub fn is_port_allowed(&self, port: u16) -> bool {
        self.allowed_ports.contains(&port)
    }

    /// True when no classification flag and no blocked range matches `ip`.
    pub fn is_ip_allowed(&self, ip: IpAddr) -> bool {
        self.blocked_by(ip).is_none()
    }

    /// The first rule that rejects `ip`, if any.
    ///
    /// All rules are independent; the order here only decides which one is
    /// reported. IPv4-mapped IPv6 addresses are checked as IPv4.
    pub fn blocked_by(&self, ip: IpAddr) -> Option<BlockReason> {
        let ip = canonical_ip(ip);

        if self.block_private {
            if is_loopback(ip) {
                return Some(BlockReason::Loopback);
            }
            if is_private(ip) {
                return Some(BlockReason::Private);
            }
        }

        if self.block_link_local && (is_link_local_unicast(ip) || is_link_local_multicast(ip)) {
            return Some(BlockReason::LinkLocal);
        }

        if self.block_multicast && (is_multicast(ip) || is_interface_local_multicast(ip)) {
            return Some(BlockReason::Multicast);
        }

        if self.block_unspecified && is_unspecified(ip) {
            return Some(BlockReason::Unspecified);
        }

        self.blocked_ranges
            .iter()
            .find(|range| range.contains(ip))
            .map(|range| BlockReason::Range(*range))
    }
}
