//! Banner grabbing and classification for open ports.
//!
//! Port 80 gets a minimal HTTP request, port 443 is reported as TLS without a
//! handshake, and every other port gets a short greeting. Only the first line
//! of the reply is classified.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, trace};

const HTTP_REQUEST: &[u8] = b"GET / HTTP/1.1\r\nHost: test\r\n\r\n";
const GREETING: &[u8] = b"HELLO\r\n";

/// Server products recognised in a banner's first line, matched case-insensitively.
const KNOWN_SERVER_TOKENS: &[&str] = &["Apache", "nginx", "OpenSSH", "vsftpd", "Microsoft", "IIS"];

pub const TLS_MARKER: &str = "TLS/SSL detected";
pub const HTTP_MARKER: &str = "HTTP server detected";
pub const UNKNOWN_MARKER: &str = "unknown";
/// Port is open but nothing could be read from it.
pub const OPEN_MARKER: &str = "open";

/// Second stage of a probe unit: identify the service behind an open port.
///
/// Implementations never fail; I/O problems collapse into [`OPEN_MARKER`].
#[async_trait]
pub trait BannerEnricher: Send + Sync {
    async fn enrich(&self, addr: SocketAddr) -> String;
}

/// Enricher that opens a fresh TCP connection and grabs a banner over it.
#[derive(Debug, Clone)]
pub struct TcpBannerGrabber {
    timeout: Duration,
    max_bytes: usize,
}

impl TcpBannerGrabber {
    pub fn new(timeout: Duration, max_bytes: usize) -> Self {
        Self { timeout, max_bytes }
    }
}

#[async_trait]
impl BannerEnricher for TcpBannerGrabber {
    async fn enrich(&self, addr: SocketAddr) -> String {
        match time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(mut stream)) => grab(&mut stream, addr.port(), self.max_bytes, self.timeout).await,
            Ok(Err(e)) => {
                debug!(%addr, error = %e, "banner connect failed");
                OPEN_MARKER.to_string()
            }
            Err(_) => {
                debug!(%addr, "banner connect timed out");
                OPEN_MARKER.to_string()
            }
        }
    }
}

/// Send the port-appropriate probe over an established connection and classify the reply.
pub async fn grab<S>(stream: &mut S, port: u16, max_bytes: usize, read_timeout: Duration) -> String
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let payload = match port {
        443 => return TLS_MARKER.to_string(),
        80 => HTTP_REQUEST,
        _ => GREETING,
    };

    if let Err(e) = stream.write_all(payload).await {
        trace!(port, error = %e, "banner probe write failed");
        return OPEN_MARKER.to_string();
    }

    let mut buf = vec![0u8; max_bytes.max(1)];
    match time::timeout(read_timeout, stream.read(&mut buf)).await {
        Ok(Ok(n)) => {
            buf.truncate(n);
            classify_response(&buf)
        }
        Ok(Err(e)) => {
            trace!(port, error = %e, "banner read failed");
            OPEN_MARKER.to_string()
        }
        Err(_) => {
            trace!(port, "banner read timed out");
            OPEN_MARKER.to_string()
        }
    }
}

/// Classify a raw service reply by its first line.
pub fn classify_response(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let first_line = text.split('\n').next().unwrap_or("");
    classify_line(first_line)
}

fn classify_line(line: &str) -> String {
    let lower = line.to_lowercase();
    if KNOWN_SERVER_TOKENS
        .iter()
        .any(|token| lower.contains(&token.to_lowercase()))
    {
        return line.trim().to_string();
    }
    if line.contains("HTTP") {
        return HTTP_MARKER.to_string();
    }
    UNKNOWN_MARKER.to_string()
}

/// Attach the probe confidence to a classification, e.g. `"nginx/1.18 (100% confidence)"`.
pub fn annotate(classification: &str, confidence: u8) -> String {
    format!("{classification} ({confidence}% confidence)")
}
