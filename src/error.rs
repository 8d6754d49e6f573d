// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Why a single auction document could not be turned into a row.
#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed XML: {0}")]
    Malformed(String),
    #[error("document has no record elements")]
    NoRecords,
    #[error("announcement record has no AuctionDate")]
    MissingAuctionDate,
    #[error("unrecognised AuctionDate {0:?}")]
    InvalidAuctionDate(String),
}

/// Errors surfaced by the normalizer. Any of these aborts the whole run.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {document}: {reason}")]
    Parse {
        document: String,
        #[source]
        reason: ParseFailure,
    },

    #[error("no auction documents to normalize ({0})")]
    EmptyInput(String),

    #[error("unknown security type {0:?} (expected bill, note or bond)")]
    UnknownSecurityType(String),

    #[error("invalid document pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl NormalizeError {
    pub(crate) fn parse(document: impl Into<String>, reason: ParseFailure) -> Self {
        NormalizeError::Parse {
            document: document.into(),
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, NormalizeError>;
