// Normalize documents already on disk, without touching the network.
//
//     normalize <data_dir> <bill|note|bond>

use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use auctionscraper::{normalize_dir, SecurityType};
use std::{env, path::PathBuf, time::Instant};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env_filter).init();

    let mut args = env::args().skip(1);
    let data_dir = PathBuf::from(
        args.next()
            .context("usage: normalize <data_dir> <bill|note|bond>")?,
    );
    let security: SecurityType = args
        .next()
        .context("missing security type (bill, note or bond)")?
        .parse()?;

    let start = Instant::now();
    let table = normalize_dir(&data_dir, security)?;
    println!("{}", pretty_format_batches(&[table.to_record_batch()?])?);
    info!(
        rows = table.num_rows(),
        columns = table.columns().len(),
        elapsed = ?start.elapsed(),
        "normalized {}",
        data_dir.display()
    );
    Ok(())
}
