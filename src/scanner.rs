use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use ::time::OffsetDateTime;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::banner::{annotate, BannerEnricher, TcpBannerGrabber, OPEN_MARKER};
use crate::config::ScanConfig;
use crate::error::Result;
use crate::ports::service_guess;
use crate::probe::{PortClassifier, TcpProbe};
use crate::risk;
use crate::signatures::{infer_os, match_exploit};
use crate::store::ResultStore;
use crate::types::{Finding, PortResult, PortState, ScanReport, ScanSession, SessionSummary};

/// Lifecycle of one scan invocation. Phases only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScanPhase {
    Idle,
    Scanning,
    Aggregating,
    Done,
}

fn enter(phase: &mut ScanPhase, next: ScanPhase, host: &str) {
    debug_assert!(next > *phase, "scan phase moved backwards: {phase:?} -> {next:?}");
    debug!(host, from = ?*phase, to = ?next, "scan phase");
    *phase = next;
}

/// Scan with real TCP stages. Convenience wrapper over [`ScanOrchestrator::run`].
pub async fn scan(config: ScanConfig) -> Result<ScanReport> {
    ScanOrchestrator::new(config).run().await
}

/// Variant that accepts a `CancellationToken` to allow external cancellation.
pub async fn scan_with_cancel(config: ScanConfig, cancel: CancellationToken) -> Result<ScanReport> {
    ScanOrchestrator::new(config).run_with_cancel(cancel).await
}

/// Drives bounded, concurrent probe units across a port range.
///
/// Each run allocates its own [`ResultStore`]; nothing carries over between runs.
pub struct ScanOrchestrator {
    config: ScanConfig,
    classifier: Arc<dyn PortClassifier>,
    enricher: Arc<dyn BannerEnricher>,
}

impl ScanOrchestrator {
    /// Orchestrator using TCP connect probing and TCP banner grabbing.
    pub fn new(config: ScanConfig) -> Self {
        let classifier = Arc::new(TcpProbe::new(config.timeout));
        let enricher = Arc::new(TcpBannerGrabber::new(config.timeout, config.banner_bytes));
        Self::with_stages(config, classifier, enricher)
    }

    /// Orchestrator with caller-supplied classify and enrich stages.
    pub fn with_stages(
        config: ScanConfig,
        classifier: Arc<dyn PortClassifier>,
        enricher: Arc<dyn BannerEnricher>,
    ) -> Self {
        Self {
            config,
            classifier,
            enricher,
        }
    }

    pub async fn run(&self) -> Result<ScanReport> {
        self.run_with_cancel(CancellationToken::new()).await
    }

    /// Run the scan. Cancelling the token stops admission of new probe units;
    /// units already running finish and their results are kept.
    pub async fn run_with_cancel(&self, cancel: CancellationToken) -> Result<ScanReport> {
        let cfg = &self.config;
        let ip = match self.prepare().await {
            Ok(ip) => ip,
            Err(e) => {
                warn!(host = %cfg.target, code = e.code(), error = %e, "scan rejected");
                return Err(e);
            }
        };

        let mut phase = ScanPhase::Idle;
        let started_at = OffsetDateTime::now_utc();
        let clock = Instant::now();
        info!(
            host = %cfg.target,
            %ip,
            start = cfg.start_port,
            end = cfg.end_port,
            retries = cfg.retries,
            detect_version = cfg.detect_version,
            concurrency = cfg.effective_concurrency(),
            "starting scan"
        );

        enter(&mut phase, ScanPhase::Scanning, &cfg.target);
        let store = ResultStore::new();
        let cancelled = self.dispatch(ip, &store, &cancel).await;

        enter(&mut phase, ScanPhase::Aggregating, &cfg.target);
        let (results, closed_count) = store.finish().await;
        let session = ScanSession {
            target: cfg.target.clone(),
            port_range: (cfg.start_port, cfg.end_port),
            retries: cfg.retries,
            detect_version: cfg.detect_version,
            results,
            closed_count,
            started_at,
            finished_at: OffsetDateTime::now_utc(),
        };
        let summary = summarize(&session, cancelled);

        enter(&mut phase, ScanPhase::Done, &cfg.target);
        let elapsed_ms = clock.elapsed().as_millis() as u64;
        info!(
            host = %cfg.target,
            open = summary.open_ports.len(),
            closed = summary.closed_count,
            os = %summary.os_guess,
            risk = %summary.risk_level,
            score = summary.risk_score,
            cancelled,
            elapsed_ms,
            "scan finished"
        );
        Ok(ScanReport { session, summary })
    }

    async fn prepare(&self) -> Result<IpAddr> {
        self.config.validate()?;
        self.config.resolve().await
    }

    /// Admit one probe unit per port under the concurrency limit and wait for all of them.
    /// Returns whether admission stopped early because of cancellation.
    async fn dispatch(&self, ip: IpAddr, store: &ResultStore, cancel: &CancellationToken) -> bool {
        let cfg = &self.config;
        let sem = Arc::new(Semaphore::new(cfg.effective_concurrency()));
        let mut set = JoinSet::new();
        let mut cancelled = false;

        for port in cfg.start_port..=cfg.end_port {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                permit = sem.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(error = %e, "semaphore closed, stopping admission");
                        break;
                    }
                },
            };
            let store = store.clone();
            let classifier = Arc::clone(&self.classifier);
            let enricher = Arc::clone(&self.enricher);
            let retries = cfg.retries;
            let detect_version = cfg.detect_version;

            set.spawn(async move {
                let _permit = permit; // keep permit until the result is stored
                let addr = SocketAddr::new(ip, port);
                let result =
                    run_unit(addr, retries, detect_version, &*classifier, &*enricher).await;
                store.record(result).await;
            });
            reap_finished(&mut set);
        }

        if cancelled {
            info!(host = %cfg.target, in_flight = set.len(), "scan cancelled, draining");
        }
        while let Some(res) = set.join_next().await {
            log_join_error(res);
        }
        cancelled
    }
}

/// Remove already-completed units from the set without waiting, so it only
/// holds units that are still running. Returns how many were removed.
fn reap_finished(set: &mut JoinSet<()>) -> usize {
    let mut reaped = 0;
    while let Some(res) = set.try_join_next() {
        log_join_error(res);
        reaped += 1;
    }
    reaped
}

fn log_join_error(res: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = res {
        warn!(error = %e, "probe unit did not complete");
    }
}

/// Classify one port, then enrich it with a banner if it is open and detection is on.
async fn run_unit(
    addr: SocketAddr,
    retries: u32,
    detect_version: bool,
    classifier: &dyn PortClassifier,
    enricher: &dyn BannerEnricher,
) -> PortResult {
    let port = addr.port();
    let outcome = classifier.classify(addr, retries).await;
    if !outcome.is_open() {
        debug!(port, successes = outcome.successes, "port closed");
        return PortResult::closed(port, outcome.confidence);
    }

    let classification = if detect_version {
        enricher.enrich(addr).await
    } else {
        OPEN_MARKER.to_string()
    };
    debug!(port, confidence = outcome.confidence, %classification, "port open");
    PortResult {
        port,
        state: PortState::Open,
        confidence: outcome.confidence,
        banner: Some(annotate(&classification, outcome.confidence)),
        service_guess: service_guess(port).map(String::from),
    }
}

/// Derive the read-only summary of a frozen session.
pub fn summarize(session: &ScanSession, cancelled: bool) -> SessionSummary {
    let open_ports = session.open_ports();
    let assessment = risk::score(&open_ports, session.banners());
    let findings = session
        .results
        .values()
        .filter(|r| r.is_open())
        .filter_map(|r| {
            let sig = match_exploit(r.banner.as_deref()?)?;
            Some(Finding {
                port: r.port,
                service: r.service_guess.clone(),
                cve_id: sig.cve_id.to_string(),
                severity: sig.severity,
            })
        })
        .collect();
    let elapsed = session.finished_at - session.started_at;

    SessionSummary {
        target: session.target.clone(),
        open_ports,
        closed_count: session.closed_count,
        scanned_count: session.results.len() as u64,
        os_guess: infer_os(session.banners()).to_string(),
        risk_level: assessment.level,
        risk_score: assessment.score,
        findings,
        cancelled,
        elapsed_ms: elapsed.whole_milliseconds().max(0) as u64,
    }
}
