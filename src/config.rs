// src/config.rs

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use url::Url;

use crate::security::SecurityType;

pub const DEFAULT_BASE_URL: &str = "https://www.treasurydirect.gov/xml/";

/// Run configuration. Every field has a default; a YAML file and then
/// `AUCTIONS_*` environment variables override them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub data_dir: PathBuf,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub security_type: SecurityType,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: PathBuf::from("Data"),
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default(),
            security_type: SecurityType::Bond,
            max_retries: 3,
            retry_backoff_ms: 500,
        }
    }
}

/// Inclusive range of auction dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl Config {
    /// Load from an optional YAML file, apply env overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_yaml_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing config {:?}", path))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = var("AUCTIONS_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = var("AUCTIONS_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = var("AUCTIONS_START_DATE") {
            self.start_date = parse_date(&v).context("AUCTIONS_START_DATE")?;
        }
        if let Some(v) = var("AUCTIONS_END_DATE") {
            self.end_date = parse_date(&v).context("AUCTIONS_END_DATE")?;
        }
        if let Some(v) = var("AUCTIONS_SECURITY_TYPE") {
            self.security_type = v.parse().context("AUCTIONS_SECURITY_TYPE")?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            bail!(
                "start_date {} is after end_date {}",
                self.start_date,
                self.end_date
            );
        }
        self.base_url()?;
        Ok(())
    }

    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url).with_context(|| format!("parsing base_url {}", self.base_url))
    }

    pub fn date_range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("expected YYYY-MM-DD, got {:?}", s))
}
