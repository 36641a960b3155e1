//! Library crate for exposure-scan: concurrent TCP port probing, banner
//! classification, exploit signature matching and risk scoring.
pub mod banner;
pub mod config;
pub mod error;
pub mod logging;
pub mod ports;
pub mod probe;
pub mod risk;
pub mod scanner;
pub mod signatures;
pub mod store;
pub mod types;

pub use config::ScanConfig;
pub use error::{Result, ScanError};
pub use scanner::{scan, scan_with_cancel, ScanOrchestrator};
pub use types::{PortResult, ScanReport, ScanSession, SessionSummary};
