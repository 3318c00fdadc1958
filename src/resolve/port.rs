//! Port text to port number.

use crate::error::DialError;
use crate::services::ServiceLookup;

/// Accumulation stops once the value reaches this, so long digit strings
/// cannot overflow.
const BIG: u32 = 0xFF_FFFF;

/// Resolve `text` to a port number for `transport`.
///
/// Pure decimal text is parsed directly and must be in 0..=65535. Anything
/// else is looked up as a service name.
pub fn resolve_port(
    transport: &str,
    text: &str,
    services: &dyn ServiceLookup,
) -> Result<u16, DialError> {
    let invalid = || DialError::InvalidPort {
        transport: transport.to_string(),
        port: text.to_string(),
    };

    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        let value = parse_decimal(text).ok_or_else(invalid)?;
        return u16::try_from(value).map_err(|_| invalid());
    }

    services.lookup(transport, text).ok_or_else(invalid)
}

fn parse_decimal(text: &str) -> Option<u32> {
    let mut n: u32 = 0;
    for b in text.bytes() {
        n = n * 10 + u32::from(b - b'0');
        if n >= BIG {
            return None;
        }
    }
    Some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DialErrorKind;
    use crate::services::ServiceTable;

    fn resolve(text: &str) -> Result<u16, DialError> {
        resolve_port("tcp", text, &ServiceTable::builtin())
    }

    #[test]
    fn test_decimal_ports() {
        assert_eq!(resolve("80").unwrap(), 80);
        assert_eq!(resolve("0").unwrap(), 0);
        assert_eq!(resolve("00443").unwrap(), 443);
        assert_eq!(resolve("65535").unwrap(), 65535);
    }

    #[test]
    fn test_out_of_range() {
        for text in ["65536", "99999", "16777215", "99999999999999999999"] {
            let err = resolve(text).unwrap_err();
            assert_eq!(err.kind(), DialErrorKind::InvalidPort, "{}", text);
        }
    }

    #[test]
    fn test_service_names() {
        assert_eq!(resolve("http").unwrap(), 80);
        assert_eq!(resolve("https").unwrap(), 443);
        assert_eq!(resolve("smtp").unwrap(), 25);
    }

    #[test]
    fn test_invalid_text() {
        for text in ["", "-1", "+80", "8o", "no-such-service"] {
            let err = resolve(text).unwrap_err();
            assert_eq!(err.kind(), DialErrorKind::InvalidPort, "{:?}", text);
        }
        assert_eq!(
            resolve("nope").unwrap_err().to_string(),
            "dial tcp: invalid port \"nope\""
        );
    }

    #[test]
    fn test_service_lookup_is_transport_aware() {
        let services = ServiceTable::builtin();
        assert_eq!(resolve_port("udp", "domain", &services).unwrap(), 53);
        assert!(resolve_port("udp", "ssh", &services).is_err());
    }
}
