use anyhow::Result;
use estoque_sync::{
    config::{PublishConfig, ReportConfig},
    locate,
    publish::SheetsClient,
    report::{load_report, normalize},
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // Every failure class is logged here and the process exits normally;
    // scheduling the next run is the operator's concern.
    if let Err(e) = run().await {
        error!("run aborted: {e:#}");
    }
    Ok(())
}

async fn run() -> Result<()> {
    // ─── 2) locate the newest export ─────────────────────────────────
    let report_cfg = ReportConfig::from_env();
    let Some(path) = locate::latest_report(&report_cfg.dir, &report_cfg.extension)? else {
        warn!(
            dir = %report_cfg.dir.display(),
            extension = %report_cfg.extension,
            "no report files found; nothing to do"
        );
        return Ok(());
    };
    info!(path = %path.display(), "loaded file");

    // ─── 3) parse + normalize ────────────────────────────────────────
    let raw = load_report(&path)?;
    let report = normalize(raw)?;
    if report.is_empty() {
        warn!("normalized report is empty; skipping sheet update");
        return Ok(());
    }
    info!(rows = report.rows.len(), "report normalized");

    // ─── 4) publish ──────────────────────────────────────────────────
    let publish_cfg = PublishConfig::from_env()?;
    let client = SheetsClient::connect(&publish_cfg).await?;
    client.publish(&report).await?;

    Ok(())
}
