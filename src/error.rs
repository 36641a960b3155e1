//! Error types for exposure-scan.
//!
//! Only invalid configuration is ever surfaced to the caller. Per-attempt
//! network failures are counted inside the probe and never become a `ScanError`.

use thiserror::Error;

/// Result type alias using [`ScanError`].
pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("invalid port range {start}-{end} (start > end)")]
    InvalidRange { start: u16, end: u16 },

    #[error("port out of range: {0} (expected 1-65535)")]
    PortOutOfRange(u32),

    #[error("retries must be greater than zero")]
    ZeroRetries,

    #[error("concurrency limit must be greater than zero")]
    ZeroConcurrency,

    #[error("per-attempt timeout must be greater than zero")]
    ZeroTimeout,

    #[error("target must not be empty")]
    EmptyTarget,

    #[error("failed to resolve target: {target}")]
    Resolve {
        target: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl ScanError {
    /// Short stable code used as a structured log field.
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::InvalidRange { .. } => "INVALID_RANGE",
            ScanError::PortOutOfRange(_) => "PORT_OUT_OF_RANGE",
            ScanError::ZeroRetries => "ZERO_RETRIES",
            ScanError::ZeroConcurrency => "ZERO_CONCURRENCY",
            ScanError::ZeroTimeout => "ZERO_TIMEOUT",
            ScanError::EmptyTarget => "EMPTY_TARGET",
            ScanError::Resolve { .. } => "RESOLVE_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_values() {
        let e = ScanError::InvalidRange { start: 90, end: 10 };
        assert_eq!(e.to_string(), "invalid port range 90-10 (start > end)");
        assert_eq!(e.code(), "INVALID_RANGE");

        let e = ScanError::PortOutOfRange(70000);
        assert!(e.to_string().contains("70000"));
    }

    #[test]
    fn resolve_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such host");
        let e = ScanError::Resolve {
            target: "nowhere.invalid".into(),
            source: Some(io),
        };
        assert!(std::error::Error::source(&e).is_some());
        assert_eq!(e.code(), "RESOLVE_FAILED");
    }
}
