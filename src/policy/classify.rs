//! Semantic address classes.
//!
//! These catch ranges an operator forgot to enumerate in the static list.

use std::net::IpAddr;

/// 10/8, 172.16/12, 192.168/16, fc00::/7.
pub fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private(),
        IpAddr::V6(v6) => v6.segments()[0] & 0xfe00 == 0xfc00,
    }
}

/// 127/8, ::1.
pub fn is_loopback(ip: IpAddr) -> bool {
    ip.is_loopback()
}

/// 169.254/16, fe80::/10.
pub fn is_link_local_unicast(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_link_local(),
        IpAddr::V6(v6) => v6.segments()[0] & 0xffc0 == 0xfe80,
    }
}

/// 224.0.0/24, link-scope IPv6 multicast (ffx2::/16).
pub fn is_link_local_multicast(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            a == 224 && b == 0 && c == 0
        }
        IpAddr::V6(v6) => v6.segments()[0] & 0xff0f == 0xff02,
    }
}

/// Interface-scope IPv6 multicast (ffx1::/16). No IPv4 equivalent.
pub fn is_interface_local_multicast(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(_) => false,
        IpAddr::V6(v6) => v6.segments()[0] & 0xff0f == 0xff01,
    }
}

/// 224/4, ff00::/8.
pub fn is_multicast(ip: IpAddr) -> bool {
    ip.is_multicast()
}

/// 0.0.0.0, ::.
pub fn is_unspecified(ip: IpAddr) -> bool {
    ip.is_unspecified()
}
