// src/security.rs

use serde::{Deserialize, Deserializer};
use std::{fmt, str::FromStr};

use crate::error::NormalizeError;

/// Marketable Treasury security categories published as auction XML.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SecurityType {
    Bill,
    Note,
    Bond,
}

impl SecurityType {
    pub const ALL: [SecurityType; 3] = [SecurityType::Bill, SecurityType::Note, SecurityType::Bond];

    /// Token carried in downloaded file names, e.g. `Bond_R_20230215_2.xml`.
    pub fn token(&self) -> &'static str {
        match self {
            SecurityType::Bill => "Bill",
            SecurityType::Note => "Note",
            SecurityType::Bond => "Bond",
        }
    }

    /// Subdirectory of the data dir holding this type's documents.
    pub fn subdir(&self) -> &'static str {
        match self {
            SecurityType::Bill => "Bills",
            SecurityType::Note => "Notes",
            SecurityType::Bond => "Bonds",
        }
    }

    /// Text found inside a document's `<SecurityType>` element.
    pub fn marker(&self) -> &'static str {
        match self {
            SecurityType::Bill => "BILL",
            SecurityType::Note => "NOTE",
            SecurityType::Bond => "BOND",
        }
    }

    /// Does a file name carry this type's token?
    pub fn matches_file_name(&self, name: &str) -> bool {
        name.contains(self.token())
    }
}

impl fmt::Display for SecurityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for SecurityType {
    type Err = NormalizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bill" => Ok(SecurityType::Bill),
            "note" => Ok(SecurityType::Note),
            "bond" => Ok(SecurityType::Bond),
            _ => Err(NormalizeError::UnknownSecurityType(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for SecurityType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
