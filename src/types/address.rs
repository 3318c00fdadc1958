//! Host and address parsing.
//!
//! Provides:
//! - `host:port` splitting with bracketed IPv6 support
//! - IP literal recognition, including legacy numeric IPv4 encodings
//!   (`2130706433`, `0x7f000001`, `127.1`, `000127.0.0.01`)
//! - canonicalization of IPv4-mapped IPv6 addresses

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const MISSING_PORT: &str = "missing port in address";
const TOO_MANY_COLONS: &str = "too many colons in address";

/// Error returned when an address is not a valid `host:port` string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("address {address}: {reason}")]
pub struct AddressError {
    /// The offending input.
    pub address: String,
    /// What was wrong with it.
    pub reason: &'static str,
}

impl AddressError {
    fn new(address: &str, reason: &'static str) -> Self {
        Self {
            address: address.to_string(),
            reason,
        }
    }
}

/// Split `host:port` into its host and port parts.
///
/// The host may be a bracketed IPv6 literal (`[::1]:80`), in which case the
/// brackets are removed. The port part is returned unparsed.
pub fn split_host_port(address: &str) -> Result<(&str, &str), AddressError> {
    let err = |reason| AddressError::new(address, reason);

    let colon = address.rfind(':').ok_or_else(|| err(MISSING_PORT))?;

    let (host, host_start, host_end) = if address.starts_with('[') {
        let end = address
            .find(']')
            .ok_or_else(|| err("missing ']' in address"))?;

        if end + 1 == address.len() {
            return Err(err(MISSING_PORT));
        }
        if end + 1 != colon {
            if address.as_bytes()[end + 1] == b':' {
                return Err(err(TOO_MANY_COLONS));
            }
            return Err(err(MISSING_PORT));
        }

        (&address[1..end], 1, end + 1)
    } else {
        let host = &address[..colon];
        if host.contains(':') {
            return Err(err(TOO_MANY_COLONS));
        }
        (host, 0, 0)
    };

    if address[host_start..].contains('[') {
        return Err(err("unexpected '[' in address"));
    }
    if address[host_end..].contains(']') {
        return Err(err("unexpected ']' in address"));
    }

    Ok((host, &address[colon + 1..]))
}

/// The host part of a dial address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Host {
    /// An IP literal, already canonicalized.
    Ip(IpAddr),
    /// A name that must go through resolution.
    Name(String),
}

impl Host {
    /// Classify a host string as an IP literal or a name.
    ///
    /// Never fails: anything that is not recognized as an IP literal is a name,
    /// and bad names surface later as resolution failures.
    pub fn parse(text: &str) -> Self {
        match parse_ip_literal(text) {
            Some(ip) => Self::Ip(ip),
            None => Self::Name(text.to_string()),
        }
    }

    /// Check if this host is an IP literal.
    pub fn is_ip(&self) -> bool {
        matches!(self, Self::Ip(_))
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip(ip) => write!(f, "{}", ip),
            Self::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Parse an IP literal in any accepted encoding.
///
/// IPv6 literals may carry a `%zone` suffix, which is discarded.
pub fn parse_ip_literal(text: &str) -> Option<IpAddr> {
    if let Ok(ip) = text.parse::<IpAddr>() {
        return Some(canonical_ip(ip));
    }

    if text.contains(':') {
        let (addr, zone) = text.split_once('%')?;
        if zone.is_empty() {
            return None;
        }
        return addr
            .parse::<Ipv6Addr>()
            .ok()
            .map(|v6| canonical_ip(IpAddr::V6(v6)));
    }

    parse_legacy_ipv4(text).map(IpAddr::V4)
}

/// Map IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) to plain IPv4.
pub fn canonical_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => ip,
        },
        IpAddr::V4(_) => ip,
    }
}

/// Parse the numeric IPv4 forms accepted by classic resolvers.
///
/// The last component fills all remaining bytes: `a` (32 bits), `a.b`
/// (8.24), `a.b.c` (8.8.16) and `a.b.c.d` (8.8.8.8). A `0x` prefix marks a
/// hexadecimal component. In the full four-part dotted form, leading zeros
/// are padding (`000127.0.00000.00001` is 127.0.0.1); in the shorter forms a
/// leading zero marks an octal component (`0177.1` is 127.0.0.1).
fn parse_legacy_ipv4(text: &str) -> Option<Ipv4Addr> {
    if text.is_empty() {
        return None;
    }

    let octal = text.split('.').count() != 4;
    let parts: Vec<u32> = text
        .split('.')
        .map(|part| parse_component(part, octal))
        .collect::<Option<Vec<_>>>()?;

    let value = match parts.as_slice() {
        [a] => *a,
        [a, b] if *a <= 0xff && *b <= 0xff_ffff => a << 24 | b,
        [a, b, c] if *a <= 0xff && *b <= 0xff && *c <= 0xffff => a << 24 | b << 16 | c,
        [a, b, c, d] if [a, b, c, d].iter().all(|p| **p <= 0xff) => {
            a << 24 | b << 16 | c << 8 | d
        }
        _ => return None,
    };

    Some(Ipv4Addr::from(value))
}

fn parse_component(text: &str, octal: bool) -> Option<u32> {
    let (digits, radix) = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None if octal && text.starts_with('0') => (text, 8),
        None => (text, 10),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    u32::from_str_radix(digits, radix).ok()
}
