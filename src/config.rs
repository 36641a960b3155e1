//! Scan configuration and its validation.

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScanError};

pub const DEFAULT_RETRIES: u32 = 3;
pub const AGGRESSIVE_RETRIES: u32 = 5;
pub const DEFAULT_CONCURRENCY: usize = 100;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_BANNER_BYTES: usize = 1024;
/// Ceiling applied to the concurrency limit when sizing the admission semaphore.
pub const MAX_CONCURRENCY: usize = 5_000;

/// Parameters for one scan. Validated before any socket is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Hostname or IP literal.
    pub target: String,
    pub start_port: u16,
    pub end_port: u16,
    /// Connection attempts per port.
    pub retries: u32,
    /// Grab and classify a banner from each open port.
    pub detect_version: bool,
    /// Maximum number of probe units in flight.
    pub concurrency: usize,
    /// Timeout for each connect attempt and for the banner read.
    pub timeout: Duration,
    /// Upper bound on bytes read for a banner.
    pub banner_bytes: usize,
}

impl ScanConfig {
    pub fn new(target: impl Into<String>, start_port: u16, end_port: u16) -> Self {
        Self {
            target: target.into(),
            start_port,
            end_port,
            retries: DEFAULT_RETRIES,
            detect_version: false,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            banner_bytes: DEFAULT_BANNER_BYTES,
        }
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn detect_version(mut self, enabled: bool) -> Self {
        self.detect_version = enabled;
        self
    }

    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Aggressive mode: five attempts per port and version detection.
    pub fn aggressive(self) -> Self {
        self.retries(AGGRESSIVE_RETRIES).detect_version(true)
    }

    /// Number of ports in the inclusive range. Only meaningful after `validate`.
    pub fn port_count(&self) -> usize {
        usize::from(self.end_port).saturating_sub(usize::from(self.start_port)) + 1
    }

    /// Concurrency limit actually used for admission, clamped to `1..=MAX_CONCURRENCY`.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }

    /// Check everything that does not need the network.
    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(ScanError::EmptyTarget);
        }
        if self.start_port == 0 {
            return Err(ScanError::PortOutOfRange(0));
        }
        if self.end_port == 0 {
            return Err(ScanError::PortOutOfRange(0));
        }
        if self.start_port > self.end_port {
            return Err(ScanError::InvalidRange {
                start: self.start_port,
                end: self.end_port,
            });
        }
        if self.retries == 0 {
            return Err(ScanError::ZeroRetries);
        }
        if self.concurrency == 0 {
            return Err(ScanError::ZeroConcurrency);
        }
        if self.timeout.is_zero() {
            return Err(ScanError::ZeroTimeout);
        }
        Ok(())
    }

    /// Resolve the target to a single address, preferring IPv4.
    pub async fn resolve(&self) -> Result<IpAddr> {
        let host = self.target.trim();
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }
        let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| ScanError::Resolve {
                target: host.to_string(),
                source: Some(e),
            })?
            .map(|sa| sa.ip())
            .collect();
        let chosen = addrs
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| ScanError::Resolve {
                target: host.to_string(),
                source: None,
            })?;
        debug!(host, ip = %chosen, "resolved scan target");
        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ScanConfig::new("127.0.0.1", 1, 100);
        assert_eq!(cfg.retries, DEFAULT_RETRIES);
        assert!(!cfg.detect_version);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.port_count(), 100);
    }

    #[test]
    fn aggressive_sets_retries_and_detection() {
        let cfg = ScanConfig::new("host", 1, 1).aggressive();
        assert_eq!(cfg.retries, 5);
        assert!(cfg.detect_version);
    }

    #[test]
    fn rejects_inverted_range() {
        let err = ScanConfig::new("h", 100, 10).validate().unwrap_err();
        assert!(matches!(err, ScanError::InvalidRange { start: 100, end: 10 }));
    }

    #[test]
    fn rejects_zero_values() {
        assert!(matches!(
            ScanConfig::new("h", 0, 10).validate(),
            Err(ScanError::PortOutOfRange(0))
        ));
        assert!(matches!(
            ScanConfig::new("h", 1, 10).retries(0).validate(),
            Err(ScanError::ZeroRetries)
        ));
        assert!(matches!(
            ScanConfig::new("h", 1, 10).concurrency(0).validate(),
            Err(ScanError::ZeroConcurrency)
        ));
        assert!(matches!(
            ScanConfig::new("h", 1, 10).timeout(Duration::ZERO).validate(),
            Err(ScanError::ZeroTimeout)
        ));
        assert!(matches!(
            ScanConfig::new("  ", 1, 10).validate(),
            Err(ScanError::EmptyTarget)
        ));
    }

    #[test]
    fn oversized_concurrency_is_clamped() {
        let cfg = ScanConfig::new("127.0.0.1", 1, 2).concurrency(usize::MAX);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.effective_concurrency(), MAX_CONCURRENCY);
        assert_eq!(cfg.clone().concurrency(64).effective_concurrency(), 64);
    }

    #[tokio::test]
    async fn oversized_concurrency_still_scans() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let cfg = ScanConfig::new("127.0.0.1", port, port)
            .concurrency(usize::MAX)
            .retries(1)
            .timeout(Duration::from_millis(300));
        let report = crate::scanner::scan(cfg).await.unwrap();
        assert_eq!(report.session.results.len(), 1);
    }

    #[tokio::test]
    async fn resolves_ip_literal_without_lookup() {
        let ip = ScanConfig::new("127.0.0.1", 1, 1).resolve().await.unwrap();
        assert_eq!(ip, IpAddr::from([127, 0, 0, 1]));
    }

    #[tokio::test]
    async fn resolves_localhost() {
        let ip = ScanConfig::new("localhost", 1, 1).resolve().await.unwrap();
        assert!(ip.is_loopback());
    }
}
