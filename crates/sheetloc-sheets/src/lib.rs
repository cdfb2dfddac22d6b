//! Boundary to the remote spreadsheet.
//!
//! The sync engine only needs a handful of operations from the spreadsheet
//! service; they are collected in [`SheetsApi`] so the engine can run against
//! the Google Sheets REST API ([`HttpSheetsClient`]) or an in-process grid
//! ([`MemorySheets`]).

pub mod a1;
pub mod auth;
pub mod http;
pub mod memory;

pub use auth::{resolve_token, ServiceAccountAuth, TokenSource};
pub use http::HttpSheetsClient;
pub use memory::{MemorySheets, TranslateCall};
pub use sheetloc_core::Result;

/// Built-in spreadsheet function used to machine-translate a cell.
pub const TRANSLATE_FUNCTION: &str = "GOOGLETRANSLATE";

/// Placeholder text a formula cell shows until the remote finished evaluating it.
pub const LOADING_MARKER: &str = "Loading...";

/// Error values the remote renders in place of a failed formula result.
pub const ERROR_MARKERS: [&str; 7] = [
    "#ERROR!", "#VALUE!", "#NAME?", "#N/A", "#REF!", "#DIV/0!", "#NUM!",
];

pub fn is_error_marker(value: &str) -> bool {
    ERROR_MARKERS.contains(&value)
}

/// How cell contents are rendered on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRender {
    /// Formulas come back as their literal text (`=GOOGLETRANSLATE(...)`).
    Formula,
    /// Formulas come back evaluated, as the user would see them.
    Formatted,
}

impl ValueRender {
    pub fn as_query(self) -> &'static str {
        match self {
            ValueRender::Formula => "FORMULA",
            ValueRender::Formatted => "FORMATTED_VALUE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetProps {
    pub sheet_id: i64,
    pub title: String,
    pub index: i64,
    pub row_count: Option<u64>,
    pub column_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetMeta {
    pub title: String,
    pub sheets: Vec<SheetProps>,
}

/// Remote operations consumed by the sync engine. Ranges use A1 notation,
/// e.g. `'2024-05-01'!A:ZZ`. Rows come back without trailing empty cells.
pub trait SheetsApi {
    fn spreadsheet(&self) -> Result<SpreadsheetMeta>;

    fn add_sheet(&self, title: &str) -> Result<()>;

    fn get_values(&self, range: &str, render: ValueRender) -> Result<Vec<Vec<String>>>;

    fn clear_values(&self, range: &str) -> Result<()>;

    /// Write `rows` starting at the range anchor. Input is parsed the way a user
    /// typing into the sheet would be, so formula text becomes a live formula.
    fn update_values(&self, range: &str, rows: &[Vec<String>]) -> Result<()>;
}

impl<T: SheetsApi + ?Sized> SheetsApi for &T {
    fn spreadsheet(&self) -> Result<SpreadsheetMeta> {
        (**self).spreadsheet()
    }
    fn add_sheet(&self, title: &str) -> Result<()> {
        (**self).add_sheet(title)
    }
    fn get_values(&self, range: &str, render: ValueRender) -> Result<Vec<Vec<String>>> {
        (**self).get_values(range, render)
    }
    fn clear_values(&self, range: &str) -> Result<()> {
        (**self).clear_values(range)
    }
    fn update_values(&self, range: &str, rows: &[Vec<String>]) -> Result<()> {
        (**self).update_values(range, rows)
    }
}

impl<T: SheetsApi + ?Sized> SheetsApi for Box<T> {
    fn spreadsheet(&self) -> Result<SpreadsheetMeta> {
        (**self).spreadsheet()
    }
    fn add_sheet(&self, title: &str) -> Result<()> {
        (**self).add_sheet(title)
    }
    fn get_values(&self, range: &str, render: ValueRender) -> Result<Vec<Vec<String>>> {
        (**self).get_values(range, render)
    }
    fn clear_values(&self, range: &str) -> Result<()> {
        (**self).clear_values(range)
    }
    fn update_values(&self, range: &str, rows: &[Vec<String>]) -> Result<()> {
        (**self).update_values(range, rows)
    }
}

/// `=GOOGLETRANSLATE(D<row>, "<src>", "<tgt>")` for a 1-based sheet row.
pub fn translate_formula(row_number: usize, source_locale: &str, target_locale: &str) -> String {
    format!(
        "={TRANSLATE_FUNCTION}({}{row_number}, \"{source_locale}\", \"{target_locale}\")",
        a1::column_letters(sheetloc_core::SOURCE_COLUMN)
    )
}

/// Prefix that makes user-entered input stay literal text. The remote keeps it
/// as cell formatting, so reads return the text without it.
pub const QUOTE_PREFIX: char = '\'';

/// True when user-entered `input` would be parsed as a formula (`=`, or a
/// leading sign that does not start a number).
pub fn parses_as_formula(input: &str) -> bool {
    match input.chars().next() {
        Some('=') => true,
        Some('+' | '-') => input.len() > 1 && input.trim().parse::<f64>().is_err(),
        _ => false,
    }
}

/// `text` as user-entered input that the remote stores verbatim.
pub fn literal_input(text: &str) -> String {
    if text.starts_with(QUOTE_PREFIX) || parses_as_formula(text) {
        format!("{QUOTE_PREFIX}{text}")
    } else {
        text.to_string()
    }
}
