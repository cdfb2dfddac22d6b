//! In-process spreadsheet used for dry runs and tests.
//!
//! Cells are stored as entered. Input is interpreted the way the remote does
//! for user-entered values: a leading `'` keeps the rest as literal text and
//! is not part of the value, while `=` (or a sign not followed by a number)
//! starts a formula. Reads in [`ValueRender::Formatted`] mode evaluate
//! translate formulas through a caller-supplied evaluator, which lets tests
//! script "Loading..." phases, errors and translations. Any other formula
//! evaluates to an error marker.

use crate::a1::{parse_cell, split_range};
use crate::{
    parses_as_formula, Result, SheetProps, SheetsApi, SpreadsheetMeta,
    ValueRender, QUOTE_PREFIX, TRANSLATE_FUNCTION,
};
use regex::Regex;
use sheetloc_core::SyncError;
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Arguments of one translate formula evaluation.
#[derive(Debug, Clone, Copy)]
pub struct TranslateCall<'a> {
    pub text: &'a str,
    pub source_locale: &'a str,
    pub target_locale: &'a str,
    /// 1-based count of formatted reads so far, including the current one.
    pub read: usize,
}

type Evaluator = Box<dyn FnMut(&TranslateCall<'_>) -> String + Send>;

struct MemorySheet {
    id: i64,
    title: String,
    cells: Vec<Vec<String>>,
}

struct State {
    title: String,
    sheets: Vec<MemorySheet>,
    next_id: i64,
    value_reads: usize,
    writes: usize,
    unavailable: Option<String>,
    evaluator: Evaluator,
}

pub struct MemorySheets {
    state: Mutex<State>,
}

impl Default for MemorySheets {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySheets {
    /// Spreadsheet whose translate formulas echo the source text.
    pub fn new() -> Self {
        Self::with_evaluator(|call| call.text.to_string())
    }

    pub fn with_evaluator<F>(evaluator: F) -> Self
    where
        F: FnMut(&TranslateCall<'_>) -> String + Send + 'static,
    {
        Self {
            state: Mutex::new(State {
                title: "memory".into(),
                sheets: Vec::new(),
                next_id: 1,
                value_reads: 0,
                writes: 0,
                unavailable: None,
                evaluator: Box::new(evaluator),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create (or replace) a sheet with raw cell content.
    pub fn seed(&self, title: &str, rows: Vec<Vec<String>>) {
        let mut st = self.lock();
        if let Some(sheet) = st.sheets.iter_mut().find(|s| s.title == title) {
            sheet.cells = rows;
            return;
        }
        let id = st.next_id;
        st.next_id += 1;
        st.sheets.push(MemorySheet {
            id,
            title: title.to_string(),
            cells: rows,
        });
    }

    /// Cells of a sheet exactly as entered, quote prefixes included.
    pub fn raw(&self, title: &str) -> Option<Vec<Vec<String>>> {
        self.lock()
            .sheets
            .iter()
            .find(|s| s.title == title)
            .map(|s| trim_grid(&s.cells))
    }

    pub fn value_reads(&self) -> usize {
        self.lock().value_reads
    }

    /// Number of successful `update_values` calls.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    /// Make every call fail as if the remote could not be reached.
    pub fn set_unavailable(&self, reason: Option<&str>) {
        self.lock().unavailable = reason.map(str::to_string);
    }
}

impl State {
    fn check_available(&self) -> Result<()> {
        match &self.unavailable {
            Some(reason) => Err(SyncError::RemoteUnavailable(reason.clone()).into()),
            None => Ok(()),
        }
    }

    fn sheet_index(&self, range: &str) -> Result<(usize, String)> {
        let (title, cells) = split_range(range)
            .ok_or_else(|| SyncError::RemoteUnavailable(format!("unable to parse range: {range}")))?;
        let idx = self
            .sheets
            .iter()
            .position(|s| s.title == title)
            .ok_or_else(|| SyncError::RemoteUnavailable(format!("unable to parse range: {range}")))?;
        Ok((idx, cells.to_string()))
    }
}

impl SheetsApi for MemorySheets {
    fn spreadsheet(&self) -> Result<SpreadsheetMeta> {
        let st = self.lock();
        st.check_available()?;
        Ok(SpreadsheetMeta {
            title: st.title.clone(),
            sheets: st
                .sheets
                .iter()
                .enumerate()
                .map(|(i, s)| SheetProps {
                    sheet_id: s.id,
                    title: s.title.clone(),
                    index: i as i64,
                    row_count: Some(s.cells.len().max(1000) as u64),
                    column_count: Some(
                        s.cells.iter().map(Vec::len).max().unwrap_or(0).max(26) as u64,
                    ),
                })
                .collect(),
        })
    }

    fn add_sheet(&self, title: &str) -> Result<()> {
        {
            let st = self.lock();
            st.check_available()?;
            if st.sheets.iter().any(|s| s.title == title) {
                return Err(SyncError::RemoteUnavailable(format!(
                    "a sheet with the name \"{title}\" already exists"
                ))
                .into());
            }
        }
        self.seed(title, Vec::new());
        Ok(())
    }

    fn get_values(&self, range: &str, render: ValueRender) -> Result<Vec<Vec<String>>> {
        let mut st = self.lock();
        st.check_available()?;
        let (idx, _) = st.sheet_index(range)?;
        let raw = trim_grid(&st.sheets[idx].cells);
        if render == ValueRender::Formula {
            let shown: Vec<Vec<String>> = raw
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| cell.strip_prefix(QUOTE_PREFIX).unwrap_or(cell).to_string())
                        .collect()
                })
                .collect();
            return Ok(trim_grid(&shown));
        }
        st.value_reads += 1;
        let read = st.value_reads;
        let mut out = Vec::with_capacity(raw.len());
        for row in &raw {
            let mut evaluated = Vec::with_capacity(row.len());
            for cell in row {
                let value = match literal_text(cell) {
                    Some(text) => text.to_string(),
                    None => evaluate(&raw, cell, read, &mut st.evaluator),
                };
                evaluated.push(value);
            }
            out.push(evaluated);
        }
        Ok(trim_grid(&out))
    }

    fn clear_values(&self, range: &str) -> Result<()> {
        let mut st = self.lock();
        st.check_available()?;
        let (idx, _) = st.sheet_index(range)?;
        st.sheets[idx].cells.clear();
        Ok(())
    }

    fn update_values(&self, range: &str, rows: &[Vec<String>]) -> Result<()> {
        let mut st = self.lock();
        st.check_available()?;
        let (idx, cells) = st.sheet_index(range)?;
        let anchor = cells.split(':').next().unwrap_or("");
        let (col0, row0) = if anchor.is_empty() {
            (0, 1)
        } else {
            parse_cell(anchor)
                .ok_or_else(|| SyncError::RemoteUnavailable(format!("unable to parse range: {range}")))?
        };
        let grid = &mut st.sheets[idx].cells;
        for (r, values) in rows.iter().enumerate() {
            let target_row = row0 - 1 + r;
            if grid.len() <= target_row {
                grid.resize(target_row + 1, Vec::new());
            }
            let row = &mut grid[target_row];
            if row.len() < col0 + values.len() {
                row.resize(col0 + values.len(), String::new());
            }
            for (c, v) in values.iter().enumerate() {
                row[col0 + c] = v.clone();
            }
        }
        st.writes += 1;
        Ok(())
    }
}

fn formula_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r#"(?i)^=\s*{TRANSLATE_FUNCTION}\(\s*([$A-Z]+[$0-9]+)\s*,\s*"([^"]*)"\s*,\s*"([^"]*)"\s*\)\s*$"#
        ))
        .expect("formula regex")
    })
}

fn call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^=\s*[A-Za-z][A-Za-z0-9_.]*\(.*\)\s*$").expect("call regex"))
}

/// Text value of an entered cell, or `None` when the input is a formula.
fn literal_text(cell: &str) -> Option<&str> {
    if let Some(text) = cell.strip_prefix(QUOTE_PREFIX) {
        return Some(text);
    }
    (!parses_as_formula(cell)).then_some(cell)
}

/// Value of a formula cell that is not a translate formula.
fn other_formula(formula: &str) -> &'static str {
    if call_re().is_match(formula) {
        // Only the translate function is known.
        "#NAME?"
    } else {
        "#ERROR!"
    }
}

fn evaluate(raw: &[Vec<String>], formula: &str, read: usize, evaluator: &mut Evaluator) -> String {
    let Some(caps) = formula_re().captures(formula) else {
        return other_formula(formula).into();
    };
    let Some((col, row)) = parse_cell(&caps[1]) else {
        return "#REF!".into();
    };
    let referenced = raw
        .get(row - 1)
        .and_then(|r| r.get(col))
        .map(String::as_str)
        .unwrap_or("");
    let text = match literal_text(referenced) {
        Some(text) => text,
        None if formula_re().is_match(referenced) => return "#REF!".into(),
        None => return other_formula(referenced).into(),
    };
    evaluator(&TranslateCall {
        text,
        source_locale: &caps[2],
        target_locale: &caps[3],
        read,
    })
}

/// Drop trailing empty cells and rows, the way the remote reports ranges.
fn trim_grid(grid: &[Vec<String>]) -> Vec<Vec<String>> {
    let mut out: Vec<Vec<String>> = grid
        .iter()
        .map(|row| {
            let end = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
            row[..end].to_vec()
        })
        .collect();
    while out.last().is_some_and(|r| r.is_empty()) {
        out.pop();
    }
    out
}
