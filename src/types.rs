use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Binary classification of a port after majority voting over all attempts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    Open,
    Closed,
}

impl PortState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortState::Open => "open",
            PortState::Closed => "closed",
        }
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one scanned port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PortResult {
    pub port: u16,
    pub state: PortState,
    /// Percentage of connection attempts that succeeded, truncated.
    pub confidence: u8,
    /// Annotated banner, e.g. `"OpenSSH_7.4 (100% confidence)"`. Only set for open ports.
    pub banner: Option<String>,
    /// Well-known service name for the port number. Only set for open ports.
    pub service_guess: Option<String>,
}

impl PortResult {
    pub fn closed(port: u16, confidence: u8) -> Self {
        Self {
            port,
            state: PortState::Closed,
            confidence,
            banner: None,
            service_guess: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == PortState::Open
    }
}

/// Severity attached to a known exploit signature.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A banner substring associated with a known CVE.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExploitSignature {
    pub pattern: &'static str,
    pub cve_id: &'static str,
    pub severity: Severity,
}

/// A banner substring hinting at the target operating system.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsHint {
    pub pattern: &'static str,
    pub os_name: &'static str,
}

/// Coarse risk classification of a finished session.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An open port whose banner matched an exploit signature.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub port: u16,
    pub service: Option<String>,
    pub cve_id: String,
    pub severity: Severity,
}

/// Everything recorded by one scan invocation. Frozen once all probe units have joined.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScanSession {
    pub target: String,
    pub port_range: (u16, u16),
    pub retries: u32,
    pub detect_version: bool,
    pub results: BTreeMap<u16, PortResult>,
    pub closed_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
}

impl ScanSession {
    /// Open ports in ascending order.
    pub fn open_ports(&self) -> Vec<u16> {
        self.results
            .values()
            .filter(|r| r.is_open())
            .map(|r| r.port)
            .collect()
    }

    /// Banners of open ports in ascending port order.
    pub fn banners(&self) -> impl Iterator<Item = &str> {
        self.results.values().filter_map(|r| r.banner.as_deref())
    }
}

/// Read-only aggregate derived from a finished [`ScanSession`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub target: String,
    pub open_ports: Vec<u16>,
    pub closed_count: u64,
    pub scanned_count: u64,
    pub os_guess: String,
    pub risk_level: RiskLevel,
    pub risk_score: u32,
    pub findings: Vec<Finding>,
    /// True when the scan was cancelled before every port was admitted.
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

/// What a scan hands back to its caller: the raw session plus its summary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub session: ScanSession,
    pub summary: SessionSummary,
}
