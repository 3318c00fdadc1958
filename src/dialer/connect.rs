//! Single connection attempts.
//!
//! The [`Connect`] trait is the socket-level seam: one attempt to one
//! address over one transport. Deadlines are applied by the caller, not here.

use async_trait::async_trait;
use socket2::{SockRef, TcpKeepalive};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::{TcpSocket, TcpStream};

/// Per-attempt socket parameters carried from the policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptOptions {
    /// Keep-alive period; `None` leaves keep-alive off.
    pub keep_alive: Option<Duration>,
    /// Local address to bind before connecting.
    pub local_address: Option<SocketAddr>,
}

/// Opens one connection to one address.
#[async_trait]
pub trait Connect: Send + Sync {
    type Stream: Send;

    /// Connect to `target` over `transport`.
    ///
    /// Implementations must refuse transports they cannot honour rather
    /// than fall back to another one.
    async fn connect(
        &self,
        transport: &str,
        target: SocketAddr,
        options: &AttemptOptions,
    ) -> io::Result<Self::Stream>;
}

/// Whether `ip` belongs to the address family a transport is pinned to.
///
/// `tcp4`/`udp4` take IPv4 only, `tcp6`/`udp6` IPv6 only, anything else
/// either family.
pub fn family_matches(transport: &str, ip: IpAddr) -> bool {
    if transport.ends_with('4') {
        ip.is_ipv4()
    } else if transport.ends_with('6') {
        ip.is_ipv6()
    } else {
        true
    }
}

/// TCP connector built on tokio sockets.
///
/// Accepts `tcp`, `tcp4` and `tcp6` only. Binds the local address when one
/// is configured and applies the keep-alive period once the handshake
/// completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl TcpConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connect for TcpConnector {
    type Stream = TcpStream;

    async fn connect(
        &self,
        transport: &str,
        target: SocketAddr,
        options: &AttemptOptions,
    ) -> io::Result<TcpStream> {
        if !matches!(transport, "tcp" | "tcp4" | "tcp6") {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unsupported transport {:?}", transport),
            ));
        }
        if !family_matches(transport, target.ip()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "mismatched address family",
            ));
        }

        let socket = if target.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };

        if let Some(local) = options.local_address {
            socket.bind(local)?;
        }

        let stream = socket.connect(target).await?;

        if let Some(period) = options.keep_alive {
            let keepalive = TcpKeepalive::new().with_time(period);
            SockRef::from(&stream).set_tcp_keepalive(&keepalive)?;
        }

        Ok(stream)
    }
}
