// src/fetch/mod.rs
pub mod classify;
pub mod documents;
pub mod urls;

use anyhow::{Context, Result};
use reqwest::Client;
use std::{
    future::Future,
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::security::SecurityType;

/// Retry settings for listing and document requests.
#[derive(Debug, Clone, Copy)]
pub struct Retry {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl From<&Config> for Retry {
    fn from(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff_ms: config.retry_backoff_ms,
        }
    }
}

async fn get_bytes_core(client: &Client, url: &Url) -> Result<Vec<u8>> {
    debug!("Fetching {}", url);
    let bytes = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .bytes()
        .await
        .with_context(|| format!("Reading body from {}", url))?;
    Ok(bytes.to_vec())
}

/// GET `url`, retrying with exponential backoff.
pub async fn get_bytes_with_retry(client: &Client, url: &Url, retry: &Retry) -> Result<Vec<u8>> {
    let mut attempts = 0;
    loop {
        match get_bytes_core(client, url).await {
            Ok(b) => return Ok(b),
            Err(e) if attempts < retry.max_retries => {
                attempts += 1;
                let backoff = backoff_ms(retry.initial_backoff_ms, attempts);
                warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                sleep(Duration::from_millis(backoff)).await;
            }
            Err(e) => {
                error!(%url, error = %e, "Exhausted retries");
                return Err(e);
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based), doubling each time.
fn backoff_ms(initial_ms: u64, attempt: u32) -> u64 {
    initial_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

pub async fn get_text_with_retry(client: &Client, url: &Url, retry: &Retry) -> Result<String> {
    let bytes = get_bytes_with_retry(client, url, retry).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Discover result documents in the configured date range, keep those whose
/// `<SecurityType>` matches, and store them under the data dir.
#[instrument(level = "info", skip(client, config), fields(security = %config.security_type))]
pub async fn select_documents(client: &Client, config: &Config) -> Result<Vec<PathBuf>> {
    let retry = Retry::from(config);
    let base = config.base_url()?;
    let links = urls::fetch_result_links(client, &base, &config.date_range(), &retry).await?;
    store_documents(links, &config.data_dir, config.security_type, |url| async move {
        get_bytes_with_retry(client, &url, &retry).await
    })
    .await
}

/// Store every `links` document of type `security` under `data_dir`,
/// downloading with `fetch`.
///
/// Documents already on disk are reused without calling `fetch`. Documents
/// of another type, or that fail to parse, are skipped. Returns the stored
/// paths sorted by file name.
pub async fn store_documents<F, Fut>(
    links: Vec<Url>,
    data_dir: &Path,
    security: SecurityType,
    mut fetch: F,
) -> Result<Vec<PathBuf>>
where
    F: FnMut(Url) -> Fut,
    Fut: Future<Output = Result<Vec<u8>>>,
{
    let mut stored = Vec::new();
    let (mut cached, mut skipped) = (0usize, 0usize);
    for url in links {
        let Some(name) = documents::document_file_name(&url) else {
            continue;
        };
        let dest = documents::document_path(data_dir, security, name);
        if dest.exists() {
            debug!(name = %name, "already stored");
            cached += 1;
            stored.push(dest);
            continue;
        }

        let start = Instant::now();
        let bytes = fetch(url.clone())
            .await
            .with_context(|| format!("downloading {}", url))?;
        match classify::is_security_type(&bytes, security) {
            Ok(true) => {
                let path = documents::save_document(data_dir, security, name, &bytes).await?;
                info!(name = %name, elapsed = ?start.elapsed(), "downloaded");
                stored.push(path);
            }
            Ok(false) => {
                let actual = classify::classify(&bytes).ok().flatten();
                debug!(name = %name, ?actual, "different security type");
                skipped += 1;
            }
            Err(e) => {
                warn!(name = %name, error = %e, "unreadable document; skipping");
                skipped += 1;
            }
        }
    }

    stored.sort();
    info!(
        stored = stored.len(),
        cached, skipped, "document selection complete"
    );
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        collections::HashMap,
        fs,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
    };
    use tempfile::TempDir;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    const BASE: &str = "https://www.treasurydirect.gov/xml/";

    fn typed(security: &str) -> Vec<u8> {
        format!(
            "<td:AuctionData xmlns:td=\"http://www.treasurydirect.gov/\">\
             <AuctionResults><SecurityType>{security}</SecurityType>\
             <AuctionDate>2023-01-05</AuctionDate></AuctionResults></td:AuctionData>"
        )
        .into_bytes()
    }

    fn link(name: &str) -> Url {
        Url::parse(BASE).unwrap().join(name).unwrap()
    }

    #[tokio::test]
    async fn stores_matching_documents_and_reuses_cached_ones() -> Result<()> {
        let tmp = TempDir::new()?;
        let cached = documents::document_path(tmp.path(), SecurityType::Bond, "R_20230105_1.xml");
        fs::create_dir_all(cached.parent().unwrap())?;
        fs::write(&cached, typed("BOND"))?;

        let bodies: HashMap<String, Vec<u8>> = [
            ("R_20230106_1.xml", typed("NOTE")),
            ("R_20230107_1.xml", b"<root><rec><A>1</A></root>".to_vec()),
            ("R_20230108_1.xml", typed("BOND")),
        ]
        .into_iter()
        .map(|(name, body)| (link(name).to_string(), body))
        .collect();
        let requested = Arc::new(Mutex::new(Vec::new()));

        let links = ["R_20230108_1.xml", "R_20230105_1.xml", "R_20230106_1.xml", "R_20230107_1.xml"]
            .into_iter()
            .map(link)
            .collect();
        let stored = store_documents(links, tmp.path(), SecurityType::Bond, |url| {
            let requested = Arc::clone(&requested);
            let body = bodies.get(url.as_str()).cloned();
            async move {
                requested.lock().unwrap().push(url.to_string());
                body.context("no such document")
            }
        })
        .await?;

        let bonds = tmp.path().join("Bonds");
        assert_eq!(
            stored,
            vec![bonds.join("Bond_R_20230105_1.xml"), bonds.join("Bond_R_20230108_1.xml")]
        );
        assert_eq!(fs::read(&stored[1])?, typed("BOND"));
        assert!(!bonds.join("Bond_R_20230106_1.xml").exists());
        assert!(!bonds.join("Bond_R_20230107_1.xml").exists());
        assert!(!tmp.path().join("Notes").exists());

        let requested = requested.lock().unwrap();
        assert_eq!(requested.len(), 3);
        assert!(!requested.iter().any(|u| u.ends_with("R_20230105_1.xml")));
        Ok(())
    }

    #[tokio::test]
    async fn download_failure_aborts_selection() -> Result<()> {
        let tmp = TempDir::new()?;
        let links = vec![link("R_20230105_1.xml")];
        let result = store_documents(links, tmp.path(), SecurityType::Bill, |_| async {
            Err::<Vec<u8>, _>(anyhow::anyhow!("connection refused"))
        })
        .await;
        assert!(result.is_err());
        assert!(!tmp.path().join("Bills").exists());
        Ok(())
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1000);
        assert_eq!(backoff_ms(500, 4), 4000);
        assert_eq!(backoff_ms(500, 200), u64::MAX);
        assert_eq!(backoff_ms(0, 200), 0);
    }

    /// Answer one connection per canned response, counting connections.
    async fn serve(responses: Vec<&'static str>) -> Result<(Url, Arc<AtomicUsize>)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            for response in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        Ok((Url::parse(&format!("http://{addr}/xml/R_20230105_1.xml"))?, hits))
    }

    const UNAVAILABLE: &str =
        "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
    const OK: &str = "HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\n<r/>";

    #[tokio::test]
    async fn retries_until_success() -> Result<()> {
        let (url, hits) = serve(vec![UNAVAILABLE, UNAVAILABLE, OK]).await?;
        let retry = Retry {
            max_retries: 3,
            initial_backoff_ms: 1,
        };
        let bytes = get_bytes_with_retry(&Client::new(), &url, &retry).await?;
        assert_eq!(bytes, b"<r/>");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() -> Result<()> {
        let (url, hits) = serve(vec![UNAVAILABLE, UNAVAILABLE, OK]).await?;
        let retry = Retry {
            max_retries: 1,
            initial_backoff_ms: 1,
        };
        let result = get_bytes_with_retry(&Client::new(), &url, &retry).await;
        assert!(result.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        Ok(())
    }
}
