use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use url::Url;

use crate::security::SecurityType;

/// Last path segment of a document URL.
pub fn document_file_name(url: &Url) -> Option<&str> {
    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty())
}

/// Where a document of type `security` is stored: `<data_dir>/<Subdir>/<Token>_<name>`.
pub fn document_path(data_dir: &Path, security: SecurityType, file_name: &str) -> PathBuf {
    data_dir
        .join(security.subdir())
        .join(format!("{}_{}", security.token(), file_name))
}

/// Write a document's bytes to its typed location, creating directories as needed.
pub async fn save_document(
    data_dir: &Path,
    security: SecurityType,
    file_name: &str,
    bytes: &[u8],
) -> Result<PathBuf> {
    let dest = document_path(data_dir, security, file_name);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {:?}", parent))?;
    }
    fs::write(&dest, bytes)
        .await
        .with_context(|| format!("writing {:?}", dest))?;
    Ok(dest)
}
