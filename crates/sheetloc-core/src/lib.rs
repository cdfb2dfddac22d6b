use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Workspace-wide result alias.
pub type Result<T> = color_eyre::eyre::Result<T>;

/// Flat key -> string map, the only shape the sync engine sees from string stores.
pub type StringMap = BTreeMap<String, String>;

/// Tag used when a run does not specify one.
pub const DEFAULT_TAG: &str = "default";

/// Fixed leading header cells; the source locale column follows them.
pub const FIXED_HEADER: [&str; 3] = ["File", "Key", "Tag"];

/// Zero-based index of the source-text column (column D).
pub const SOURCE_COLUMN: usize = 3;

/// How many cell errors are spelled out in a failure message.
pub const MAX_REPORTED_CELL_ERRORS: usize = 5;

/// One translatable string identified by (file, key, tag).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub file: String,
    pub key: String,
    /// Free-form grouping label; part of the row identity only.
    pub tag: String,
    pub source_text: String,
}

impl Entry {
    pub fn row_key(&self) -> RowKey {
        RowKey::new(&self.file, &self.key, &self.tag)
    }
}

/// Composite row identity `file|key|tag` used for upsert matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey(String);

impl RowKey {
    pub fn new(file: &str, key: &str, tag: &str) -> Self {
        Self(format!("{file}|{key}|{tag}"))
    }

    /// Identity of a raw sheet row; missing cells count as empty.
    pub fn from_cells(row: &[String]) -> Self {
        let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
        Self::new(cell(0), cell(1), cell(2))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Masked text plus the placeholders it replaced; token `[[T_i]]` maps to `placeholders[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskResult {
    pub masked_text: String,
    pub placeholders: Vec<String>,
}

/// Failure taxonomy of a synchronization run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("remote spreadsheet unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("target locale column '{0}' not found in sheet")]
    ColumnNotFound(String),

    #[error("spreadsheet reported errors:\n{}", first_errors(.errors))]
    TranslationCells { errors: Vec<String> },

    #[error("timed out waiting for translations after {attempts} attempt(s) every {interval_secs}s")]
    PollTimeout { attempts: u32, interval_secs: u64 },

    #[error("invalid source value for key '{key}': {reason}")]
    InvalidSourceData { key: String, reason: String },

    #[error("invalid locale: {0}")]
    InvalidLocale(String),
}

fn first_errors(errors: &[String]) -> String {
    errors
        .iter()
        .take(MAX_REPORTED_CELL_ERRORS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}
