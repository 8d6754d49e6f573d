use anyhow::Result;
use arrow::util::pretty::pretty_format_batches;
use auctionscraper::{fetch, process, Config};
use reqwest::Client;
use std::{env, fs, path::PathBuf};
use tokio::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) load config ──────────────────────────────────────────────
    let config_path = env::args()
        .nth(1)
        .or_else(|| env::var("AUCTIONS_CONFIG").ok())
        .map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    info!(
        security = %config.security_type,
        start = %config.start_date,
        end = %config.end_date,
        data_dir = %config.data_dir.display(),
        "config loaded"
    );
    fs::create_dir_all(&config.data_dir)?;

    // ─── 3) select + download matching documents ─────────────────────
    let start = Instant::now();
    let client = Client::new();
    let paths = fetch::select_documents(&client, &config).await?;
    info!(documents = paths.len(), elapsed = ?start.elapsed(), "selection done");

    // ─── 4) normalize on the blocking pool ───────────────────────────
    let data_dir = config.data_dir.clone();
    let security = config.security_type;
    let table =
        tokio::task::spawn_blocking(move || process::normalize_dir(&data_dir, security)).await??;

    // ─── 5) report ───────────────────────────────────────────────────
    let batch = table.to_record_batch()?;
    println!("{}", pretty_format_batches(&[batch])?);
    info!(
        rows = table.num_rows(),
        columns = table.columns().len(),
        "all done"
    );
    Ok(())
}
