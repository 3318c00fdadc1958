//! Service-name lookup for symbolic ports.
//!
//! Maps names such as `http` or `https` to port numbers for a transport.
//! A built-in table covers the common services; the system services(5)
//! database is merged on top of it when readable.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tracing::debug;

/// Location of the system services database.
pub const SERVICES_PATH: &str = "/etc/services";

/// Well-known services shipped with the crate.
static BUILTIN_SERVICES: &[(&str, u16, Protocol)] = &[
    ("ftp-data", 20, Protocol::Tcp),
    ("ftp", 21, Protocol::Tcp),
    ("ssh", 22, Protocol::Tcp),
    ("telnet", 23, Protocol::Tcp),
    ("smtp", 25, Protocol::Tcp),
    ("domain", 53, Protocol::Tcp),
    ("domain", 53, Protocol::Udp),
    ("tftp", 69, Protocol::Udp),
    ("gopher", 70, Protocol::Tcp),
    ("finger", 79, Protocol::Tcp),
    ("http", 80, Protocol::Tcp),
    ("www", 80, Protocol::Tcp),
    ("kerberos", 88, Protocol::Tcp),
    ("kerberos", 88, Protocol::Udp),
    ("pop3", 110, Protocol::Tcp),
    ("sunrpc", 111, Protocol::Tcp),
    ("sunrpc", 111, Protocol::Udp),
    ("nntp", 119, Protocol::Tcp),
    ("ntp", 123, Protocol::Udp),
    ("imap2", 143, Protocol::Tcp),
    ("imap", 143, Protocol::Tcp),
    ("snmp", 161, Protocol::Udp),
    ("bgp", 179, Protocol::Tcp),
    ("imap3", 220, Protocol::Tcp),
    ("ldap", 389, Protocol::Tcp),
    ("https", 443, Protocol::Tcp),
    ("https", 443, Protocol::Udp),
    ("microsoft-ds", 445, Protocol::Tcp),
    ("submissions", 465, Protocol::Tcp),
    ("syslog", 514, Protocol::Udp),
    ("submission", 587, Protocol::Tcp),
    ("ipp", 631, Protocol::Tcp),
    ("ldaps", 636, Protocol::Tcp),
    ("rsync", 873, Protocol::Tcp),
    ("ftps", 990, Protocol::Tcp),
    ("imaps", 993, Protocol::Tcp),
    ("pop3s", 995, Protocol::Tcp),
    ("socks", 1080, Protocol::Tcp),
    ("openvpn", 1194, Protocol::Udp),
    ("ms-sql-s", 1433, Protocol::Tcp),
    ("mqtt", 1883, Protocol::Tcp),
    ("nfs", 2049, Protocol::Tcp),
    ("nfs", 2049, Protocol::Udp),
    ("mysql", 3306, Protocol::Tcp),
    ("ms-wbt-server", 3389, Protocol::Tcp),
    ("sip", 5060, Protocol::Tcp),
    ("sip", 5060, Protocol::Udp),
    ("xmpp-client", 5222, Protocol::Tcp),
    ("postgresql", 5432, Protocol::Tcp),
    ("amqp", 5672, Protocol::Tcp),
    ("redis", 6379, Protocol::Tcp),
    ("http-alt", 8080, Protocol::Tcp),
    ("webcache", 8080, Protocol::Tcp),
    ("https-alt", 8443, Protocol::Tcp),
    ("pcsync-https", 8443, Protocol::Tcp),
    ("memcache", 11211, Protocol::Tcp),
];

/// Process-wide table loaded from the system database once.
static SYSTEM_TABLE: LazyLock<Arc<ServiceTable>> =
    LazyLock::new(|| Arc::new(ServiceTable::with_database(SERVICES_PATH)));

/// Protocol column of a services entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// Map a transport identifier (`tcp`, `tcp4`, `udp6`, ...) to its protocol.
    pub fn from_transport(transport: &str) -> Option<Self> {
        match transport {
            "tcp" | "tcp4" | "tcp6" => Some(Self::Tcp),
            "udp" | "udp4" | "udp6" => Some(Self::Udp),
            _ => None,
        }
    }

    fn from_column(column: &str) -> Option<Self> {
        match column {
            "tcp" => Some(Self::Tcp),
            "udp" => Some(Self::Udp),
            _ => None,
        }
    }
}

/// Resolves service names to port numbers.
pub trait ServiceLookup: Send + Sync {
    /// Look up `name` for the given transport; `None` if unknown.
    fn lookup(&self, transport: &str, name: &str) -> Option<u16>;
}

/// A service-name table.
#[derive(Debug, Clone, Default)]
pub struct ServiceTable {
    entries: HashMap<(Protocol, String), u16>,
}

impl ServiceTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in well-known services.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for &(name, port, protocol) in BUILTIN_SERVICES {
            table.insert(protocol, name, port);
        }
        table
    }

    /// The built-in table with the database at `path` merged on top.
    ///
    /// An unreadable database is not an error: the built-in table is used alone.
    pub fn with_database(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut table = Self::builtin();

        match fs::read_to_string(path) {
            Ok(content) => {
                let merged = table.merge_database(&content);
                debug!(path = %path.display(), entries = merged, "loaded services database");
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "services database unavailable, using built-in table");
            }
        }

        table
    }

    /// Shared table backed by the system database, loaded on first use.
    pub fn system() -> Arc<ServiceTable> {
        Arc::clone(&SYSTEM_TABLE)
    }

    /// Add or replace one entry.
    pub fn insert(&mut self, protocol: Protocol, name: &str, port: u16) {
        self.entries.insert((protocol, name.to_ascii_lowercase()), port);
    }

    /// Merge entries in services(5) format: `name port/protocol [aliases...]`.
    ///
    /// Malformed lines are skipped. Returns the number of names added.
    pub fn merge_database(&mut self, content: &str) -> usize {
        let mut added = 0;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default();
            let mut fields = line.split_whitespace();

            let (Some(name), Some(port_proto)) = (fields.next(), fields.next()) else {
                continue;
            };
            let Some((port, protocol)) = port_proto.split_once('/') else {
                continue;
            };
            let (Ok(port), Some(protocol)) = (port.parse::<u16>(), Protocol::from_column(protocol))
            else {
                continue;
            };

            for alias in std::iter::once(name).chain(fields) {
                self.insert(protocol, alias, port);
                added += 1;
            }
        }

        added
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ServiceLookup for ServiceTable {
    fn lookup(&self, transport: &str, name: &str) -> Option<u16> {
        let protocol = Protocol::from_transport(transport)?;
        self.entries
            .get(&(protocol, name.to_ascii_lowercase()))
            .copied()
    }
}
