//! Response preview for established connections.
//!
//! After a guarded dial succeeds, the CLI can optionally send a payload and
//! show the first bytes the peer answers with.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

/// Maximum bytes read for a preview.
const MAX_PREVIEW_SIZE: usize = 1024;

/// Maximum characters shown after sanitizing.
const MAX_PREVIEW_CHARS: usize = 256;

/// Default time to wait for the peer to answer.
pub const PREVIEW_TIMEOUT: Duration = Duration::from_secs(3);

/// Write `payload` (if any), then read whatever the peer sends first.
///
/// Returns `None` when the peer sends nothing before `wait` elapses, closes
/// the connection, or the write fails.
pub async fn read_preview<S>(stream: &mut S, payload: Option<&[u8]>, wait: Duration) -> Option<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Some(payload) = payload {
        stream.write_all(payload).await.ok()?;
        stream.flush().await.ok()?;
    }

    let mut buffer = vec![0u8; MAX_PREVIEW_SIZE];
    match timeout(wait, stream.read(&mut buffer)).await {
        Ok(Ok(n)) if n > 0 => Some(sanitize(&buffer[..n])),
        _ => None,
    }
}

/// Expand `\r`, `\n` and `\t` escapes in a payload given on the command line.
pub fn unescape_payload(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('r') => out.push(b'\r'),
            Some('n') => out.push(b'\n'),
            Some('t') => out.push(b'\t'),
            Some('\\') => out.push(b'\\'),
            Some(other) => {
                out.push(b'\\');
                let mut buf = [0u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => out.push(b'\\'),
        }
    }
    out
}

/// Make raw bytes printable: control bytes become `.`, whitespace runs
/// collapse to one space, and the result is trimmed.
pub fn sanitize(data: &[u8]) -> String {
    let s: String = data
        .iter()
        .take(MAX_PREVIEW_CHARS)
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else if b == b'\r' || b == b'\n' || b == b'\t' {
                ' '
            } else {
                '.'
            }
        })
        .collect();

    let mut result = String::with_capacity(s.len());
    let mut prev_space = false;
    for c in s.chars() {
        if c == ' ' {
            if !prev_space {
                result.push(c);
            }
            prev_space = true;
        } else {
            result.push(c);
            prev_space = false;
        }
    }

    result.trim().to_string()
}
