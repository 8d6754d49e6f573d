//! Scrape Treasury auction XML documents and flatten them into one
//! table per security type, one row per auction.

pub mod config;
pub mod error;
pub mod fetch;
pub mod process;
pub mod security;

pub use config::Config;
pub use error::{NormalizeError, ParseFailure};
pub use process::{normalize_dir, AuctionTable};
pub use security::SecurityType;
