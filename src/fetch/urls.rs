// src/fetch/urls.rs
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

use super::{get_text_with_retry, Retry};
use crate::config::DateRange;
use crate::process::date_parser::parse_compact_date;

/// Result documents are named `R_<YYYYMMDD>_<n>.xml`.
static RESULT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^R_(\d{8})_").expect("result file name regex should compile"));

/// Fetch the directory listing at `base` and return the result documents
/// dated inside `range`, in listing order.
#[instrument(level = "info", skip(client, retry), fields(base = %base))]
pub async fn fetch_result_links(
    client: &Client,
    base: &Url,
    range: &DateRange,
    retry: &Retry,
) -> Result<Vec<Url>> {
    let html = get_text_with_retry(client, base, retry).await?;
    let links = select_result_links(&html, base, range);
    info!(count = links.len(), start = %range.start, end = %range.end, "result documents in range");
    Ok(links)
}

/// Pick result-document links out of a listing page.
pub fn select_result_links(html: &str, base: &Url, range: &DateRange) -> Vec<Url> {
    // IIS-style listings keep every entry inside a single <pre>
    let selector = Selector::parse("pre a[href]").expect("listing selector should parse");
    let document = Html::parse_document(html);
    let links = document
        .select(&selector)
        .filter_map(|e| e.value().attr("href"))
        .filter(|&href| {
            let name = href.rsplit('/').next().unwrap_or(href);
            match result_date(name) {
                Some(date) => range.contains(date),
                None => {
                    debug!(href, "not a result document");
                    false
                }
            }
        })
        .filter_map(|href| base.join(href).ok())
        .collect();
    links
}

/// Auction date encoded in a result document's file name.
pub fn result_date(name: &str) -> Option<chrono::NaiveDate> {
    let caps = RESULT_NAME.captures(name)?;
    parse_compact_date(&caps[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const LISTING: &str = r#"<html><head><title>www.treasurydirect.gov - /xml/</title></head>
<body><h1>www.treasurydirect.gov - /xml/</h1><hr>
<pre><a href="/">[To Parent Directory]</a><br><br>
 1/4/2023  9:00 AM  3512 <a href="/xml/A_20230103_1.xml">A_20230103_1.xml</a><br>
 1/5/2023 11:31 AM  6120 <a href="/xml/R_20230105_1.xml">R_20230105_1.xml</a><br>
 1/5/2023 11:31 AM  6120 <a href="R_20230105_2.xml">R_20230105_2.xml</a><br>
12/28/2022 11:31 AM 6120 <a href="/xml/R_20221228_1.xml">R_20221228_1.xml</a><br>
 1/2/2024 11:31 AM  6120 <a href="/xml/R_20240102_1.xml">R_20240102_1.xml</a><br>
 1/2/2024 11:31 AM  6120 <a href="/xml/R_2024XXXX_1.xml">R_2024XXXX_1.xml</a><br>
 1/2/2024 11:31 AM  6120 <a href="/xml/README.txt">README.txt</a><br>
</pre><hr></body></html>"#;

    fn year_2023() -> DateRange {
        DateRange {
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        }
    }

    #[test]
    fn keeps_result_documents_inside_range() {
        let base = Url::parse("https://www.treasurydirect.gov/xml/").unwrap();
        let links = select_result_links(LISTING, &base, &year_2023());
        let links: Vec<String> = links.into_iter().map(|u| u.to_string()).collect();
        assert_eq!(
            links,
            vec![
                "https://www.treasurydirect.gov/xml/R_20230105_1.xml",
                "https://www.treasurydirect.gov/xml/R_20230105_2.xml",
            ]
        );
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let base = Url::parse("https://www.treasurydirect.gov/xml/").unwrap();
        let day = NaiveDate::from_ymd_opt(2022, 12, 28).unwrap();
        let range = DateRange { start: day, end: day };
        let links = select_result_links(LISTING, &base, &range);
        assert_eq!(links.len(), 1);
        assert!(links[0].as_str().ends_with("R_20221228_1.xml"));
    }

    #[test]
    fn result_date_from_name() {
        assert_eq!(
            result_date("R_20230105_1.xml"),
            NaiveDate::from_ymd_opt(2023, 1, 5)
        );
        assert_eq!(result_date("A_20230105_1.xml"), None);
        assert_eq!(result_date("R_20231305_1.xml"), None);
        assert_eq!(result_date("R.xml"), None);
    }
}
