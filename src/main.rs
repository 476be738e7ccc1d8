use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::{
    io::{self, Write},
    time::Instant,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use uk500_etl::{
    pipeline::{self, PipelineConfig},
    report,
};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    // stdout carries the report, logs go to stderr
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(io::stderr)
        .init();

    let config = PipelineConfig::default();
    info!(config = %serde_json::to_string(&config)?, "startup");

    // ─── 2) extract → profile → clean → derive → segment ─────────────
    let start = Instant::now();
    let client = Client::new();
    let run = pipeline::run(&client, &config)?;

    // ─── 3) report ───────────────────────────────────────────────────
    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::write_report(&mut out, &run, config.preview_rows).context("writing report")?;
    out.flush()?;

    info!(
        summary = %serde_json::to_string(&run.summary())?,
        elapsed = ?start.elapsed(),
        "all done"
    );
    Ok(())
}
