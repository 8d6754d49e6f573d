// src/process/mod.rs
pub mod date_parser;
pub mod merge;
pub mod record;
pub mod table;

use glob::glob;
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{NormalizeError, Result};
use crate::security::SecurityType;

pub use merge::{merge_document, MergedRow};
pub use record::{parse_records, AuctionDocument, Record};
pub use table::AuctionTable;

/// List the XML documents in `dir` whose file name carries `security`'s token,
/// sorted by path so runs are deterministic.
pub fn list_documents(dir: &Path, security: SecurityType) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*{}*",
        glob::Pattern::escape(&dir.to_string_lossy()),
        security.token()
    );
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in glob(&pattern)? {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "skipping unreadable entry"),
        }
    }
    paths.sort();
    Ok(paths)
}

/// Normalize every `security` document in `<data_dir>/<Subdir>` into one table.
#[instrument(level = "info", skip(data_dir), fields(dir = %data_dir.as_ref().display()))]
pub fn normalize_dir(data_dir: impl AsRef<Path>, security: SecurityType) -> Result<AuctionTable> {
    let dir = data_dir.as_ref().join(security.subdir());
    let paths = list_documents(&dir, security)?;
    if paths.is_empty() {
        return Err(NormalizeError::EmptyInput(format!(
            "no {} files in {}",
            security,
            dir.display()
        )));
    }
    normalize_files(&paths)
}

/// Parse and normalize the given files, in the given order.
pub fn normalize_files(paths: &[PathBuf]) -> Result<AuctionTable> {
    let start = Instant::now();

    // pass 1: parse; collect keeps input order, so the first bad file is the one reported
    let docs = paths
        .par_iter()
        .map(|path| read_document(path))
        .collect::<Vec<_>>()
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    info!(documents = docs.len(), elapsed = ?start.elapsed(), "parsed");

    // pass 2: merge and fold into one table
    let table = normalize_documents(&docs)?;
    info!(
        rows = table.num_rows(),
        columns = table.columns().len(),
        elapsed = ?start.elapsed(),
        "normalized"
    );
    Ok(table)
}

/// Merge each document's announcement into its result and build the table.
pub fn normalize_documents(docs: &[AuctionDocument]) -> Result<AuctionTable> {
    let rows = docs.iter().try_fold(Vec::with_capacity(docs.len()), |mut rows, doc| {
        let row = merge_document(doc).map_err(|e| NormalizeError::parse(&doc.name, e))?;
        debug!(document = %doc.name, records = doc.records().len(), "merged");
        rows.push(row);
        Ok::<_, NormalizeError>(rows)
    })?;
    if rows.is_empty() {
        return Err(NormalizeError::EmptyInput("empty document set".into()));
    }
    Ok(AuctionTable::from_rows(rows).normalize())
}

fn read_document(path: &Path) -> Result<AuctionDocument> {
    let bytes = fs::read(path).map_err(|source| NormalizeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    AuctionDocument::parse(name.clone(), &bytes).map_err(|e| NormalizeError::parse(name, e))
}
