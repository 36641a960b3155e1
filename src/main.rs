use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use exposure_scan::logging::{self, LogConfig, LogFormat};
use exposure_scan::ports::parse_port_range;
use exposure_scan::types::ScanReport;
use exposure_scan::{scan_with_cancel, ScanConfig};

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// exposure-scan — concurrent TCP port scanner with banner classification and risk scoring.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "exposure-scan",
    version,
    about = "Concurrent TCP port scanner with banner classification, exploit matching and risk scoring.",
    long_about = None
)]
struct Cli {
    /// Hostname or IP address to scan.
    #[arg(short = 't', long)]
    target: String,

    /// Inclusive port range START-END, or a single port.
    #[arg(short = 'p', long, default_value = "1-100")]
    ports: String,

    /// Connection attempts per port.
    #[arg(long, default_value_t = 3)]
    retry: u32,

    /// Grab and classify service banners on open ports.
    #[arg(long = "sV", default_value_t = false)]
    service_version: bool,

    /// Aggressive mode: 5 attempts per port and banner detection.
    #[arg(short = 'A', default_value_t = false)]
    aggressive: bool,

    /// Max concurrent probe units.
    #[arg(long, default_value_t = 100)]
    concurrency: usize,

    /// Per-attempt connect and banner read timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = 1000)]
    timeout_ms: u64,

    /// Write the full report as pretty JSON to this path (optional).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log level filter used when RUST_LOG is unset.
    #[arg(long = "log-level", default_value = "warn")]
    log_level: String,

    /// Log format: pretty, compact or json.
    #[arg(long = "log-format", default_value = "compact")]
    log_format: String,
}

impl Cli {
    fn scan_config(&self) -> Result<ScanConfig> {
        let (start, end) = parse_port_range(&self.ports)
            .with_context(|| format!("invalid --ports value: {}", self.ports))?;
        let mut cfg = ScanConfig::new(self.target.clone(), start, end)
            .retries(self.retry)
            .detect_version(self.service_version)
            .concurrency(self.concurrency)
            .timeout(Duration::from_millis(self.timeout_ms));
        if self.aggressive {
            cfg = cfg.aggressive();
        }
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format: LogFormat = cli.log_format.parse()?;
    logging::init_logging_with_config(
        &LogConfig::default().level(cli.log_level.clone()).format(format),
    )?;

    let cfg = cli.scan_config()?;
    let port_count = cfg.port_count();
    println!("exposure-scan configuration:");
    println!("  target       : {}", cfg.target);
    println!("  ports        : {}-{}", cfg.start_port, cfg.end_port);
    println!("  retries      : {}", cfg.retries);
    println!("  detect_ver   : {}", cfg.detect_version);
    println!("  concurrency  : {}", cfg.concurrency);
    println!("  timeout_ms   : {}", cfg.timeout.as_millis());
    println!(
        "  output       : {}",
        cli.output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    );

    // Ctrl-C stops admitting new ports; in-flight probes finish.
    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_ctrlc.cancel();
        }
    });

    println!("\nScanning {}...", cfg.target);
    let report = match scan_with_cancel(cfg, cancel).await {
        Ok(report) => report,
        Err(e) => {
            error!(code = e.code(), error = %e, "scan did not start");
            return Err(e.into());
        }
    };
    print_dashboard(&report, port_count);
    print_results_table(&report);

    if let Some(path) = cli.output.as_deref() {
        if let Err(e) = write_report_json(path, &report) {
            eprintln!("Failed to write JSON to {}: {:#}", path.display(), e);
        } else {
            println!("Wrote JSON report to {}", path.display());
        }
    }

    Ok(())
}

fn print_dashboard(report: &ScanReport, port_count: usize) {
    let s = &report.summary;
    println!("\n===== SCAN DASHBOARD =====");
    println!("Target          : {}", s.target);
    println!("Open ports      : {}", s.open_ports.len());
    println!("Closed/Filtered : {}", s.closed_count);
    println!("Detected OS     : {}", s.os_guess);
    println!("Overall risk    : {} (score {})", s.risk_level, s.risk_score);
    println!("Time            : {} ms", s.elapsed_ms);
    if s.cancelled {
        println!(
            "Cancelled       : {} of {} ports scanned",
            s.scanned_count, port_count
        );
    }
    println!("==========================");
}

fn print_results_table(report: &ScanReport) {
    let open: Vec<_> = report
        .session
        .results
        .values()
        .filter(|r| r.is_open())
        .collect();
    if open.is_empty() {
        println!("\nNo open ports.");
        return;
    }

    let port_w = 5usize;
    let mut svc_w = "service".len();
    let mut banner_w = "banner".len();
    for r in &open {
        svc_w = svc_w.max(r.service_guess.as_deref().unwrap_or("unknown").len());
        if let Some(b) = &r.banner {
            banner_w = banner_w.max(b.chars().count().min(60));
        }
    }

    println!(
        "\n{:>port_w$}  {:<svc_w$}  {:<banner_w$}  {}",
        "port", "service", "banner", "risk",
    );
    println!(
        "{:-<port_w$}  {:-<svc_w$}  {:-<banner_w$}  {:-<8}",
        "", "", "", "",
    );
    for r in open {
        let risk = report
            .summary
            .findings
            .iter()
            .find(|f| f.port == r.port)
            .map(|f| format!("{} {}", f.severity, f.cve_id))
            .unwrap_or_else(|| "INFO".to_string());
        let bsnip: String = r.banner.as_deref().unwrap_or("").chars().take(60).collect();
        println!(
            "{:>port_w$}  {:<svc_w$}  {:<banner_w$}  {}",
            r.port,
            r.service_guess.as_deref().unwrap_or("unknown"),
            bsnip,
            risk,
        );
    }
}

fn write_report_json(path: &std::path::Path, report: &ScanReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}
