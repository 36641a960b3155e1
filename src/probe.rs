//! Repeated TCP connect probing with majority-vote classification.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::time;
use tracing::trace;

use crate::types::PortState;

/// Tally of connect attempts against one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub successes: u32,
    pub attempts: u32,
    pub state: PortState,
    pub confidence: u8,
}

impl ProbeOutcome {
    /// Classify `successes` out of `attempts`.
    ///
    /// Open iff successes form a strict majority (`successes > attempts / 2`,
    /// floor division). Confidence is `successes * 100 / attempts`, truncated.
    /// `attempts` is clamped to at least one and `successes` to at most `attempts`.
    pub fn from_counts(successes: u32, attempts: u32) -> Self {
        let attempts = attempts.max(1);
        let successes = successes.min(attempts);
        let state = if successes > attempts / 2 {
            PortState::Open
        } else {
            PortState::Closed
        };
        let confidence = (u64::from(successes) * 100 / u64::from(attempts)) as u8;
        Self {
            successes,
            attempts,
            state,
            confidence,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == PortState::Open
    }
}

/// First stage of a probe unit: decide whether a port is open.
#[async_trait]
pub trait PortClassifier: Send + Sync {
    async fn classify(&self, addr: SocketAddr, retries: u32) -> ProbeOutcome;
}

/// Classifier backed by real TCP connects.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PortClassifier for TcpProbe {
    async fn classify(&self, addr: SocketAddr, retries: u32) -> ProbeOutcome {
        probe(addr, retries, self.timeout).await
    }
}

/// Perform `retries` independent connect attempts against `addr`.
///
/// Each attempt uses a fresh socket bounded by `timeout`. Refused, reset,
/// unreachable and timed-out attempts all count as failures.
pub async fn probe(addr: SocketAddr, retries: u32, timeout: Duration) -> ProbeOutcome {
    let mut successes = 0u32;
    for attempt in 1..=retries {
        match time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => {
                successes += 1;
                trace!(%addr, attempt, "connect succeeded");
            }
            Ok(Err(e)) => trace!(%addr, attempt, error = %e, "connect failed"),
            Err(_) => trace!(%addr, attempt, "connect timed out"),
        }
    }
    ProbeOutcome::from_counts(successes, retries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn majority_vote_and_truncated_confidence() {
        for attempts in 1..=10u32 {
            for successes in 0..=attempts {
                let o = ProbeOutcome::from_counts(successes, attempts);
                assert_eq!(o.is_open(), successes > attempts / 2);
                assert_eq!(u32::from(o.confidence), successes * 100 / attempts);
            }
        }
    }

    #[test]
    fn tie_is_closed() {
        let o = ProbeOutcome::from_counts(2, 4);
        assert_eq!(o.state, PortState::Closed);
        assert_eq!(o.confidence, 50);
    }

    #[test]
    fn two_of_three_is_open_at_66() {
        let o = ProbeOutcome::from_counts(2, 3);
        assert_eq!(o.state, PortState::Open);
        assert_eq!(o.confidence, 66);
    }

    #[tokio::test]
    async fn listening_port_is_open_with_full_confidence() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                if listener.accept().await.is_err() {
                    break;
                }
            }
        });

        let o = probe(addr, 3, Duration::from_secs(1)).await;
        assert_eq!(o.successes, 3);
        assert!(o.is_open());
        assert_eq!(o.confidence, 100);
    }

    #[tokio::test]
    async fn refused_port_is_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let o = TcpProbe::new(Duration::from_millis(500)).classify(addr, 3).await;
        assert_eq!(o.successes, 0);
        assert_eq!(o.state, PortState::Closed);
        assert_eq!(o.confidence, 0);
    }
}
