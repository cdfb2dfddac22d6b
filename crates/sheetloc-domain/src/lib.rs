use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FileReport {
    pub file: String,
    pub strings: usize,
    /// "translated" | "empty" | "failed"
    pub status: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunSummary {
    pub schema_version: u32,
    pub source_locale: String,
    pub target_locale: String,
    pub sheet: String,
    pub tag: String,
    pub files_processed: usize,
    pub strings_translated: usize,
    pub files: Vec<FileReport>,
}

impl RunSummary {
    pub fn failed_files(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.status == "failed")
    }

    pub fn is_success(&self) -> bool {
        self.files_processed > 0 && self.failed_files().next().is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LocaleRun {
    pub locale: String,
    pub success: bool,
    pub summary: Option<RunSummary>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobReport {
    pub schema_version: u32,
    pub success: bool,
    pub message: String,
    pub output: String,
    pub runs: Vec<LocaleRun>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SheetSummary {
    pub id: i64,
    pub title: String,
    pub index: i64,
    pub rows: Option<u64>,
    pub columns: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatusReport {
    pub schema_version: u32,
    pub configured: bool,
    pub spreadsheet_id: Option<String>,
    /// "access_token" | "token_file" | "token_command" | "service_account" | "none"
    pub credentials: String,
    pub source_locale: String,
    pub lang_dir: String,
    pub poll_interval_secs: u64,
    pub poll_max_attempts: u32,
    pub source_files: usize,
    pub source_strings: usize,
    /// Every locale found in `lang_dir`, the source locale included.
    pub locales: Vec<String>,
    /// One entry per locale other than the source.
    pub coverage: Vec<LocaleCoverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LocaleCoverage {
    pub locale: String,
    pub translated: usize,
    pub total: usize,
    /// Rounded to one decimal; 0 when there are no source strings.
    pub percentage: f64,
}
