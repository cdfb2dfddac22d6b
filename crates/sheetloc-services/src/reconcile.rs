//! Upsert of translation rows into the remote sheet.
//!
//! Layout of a sheet:
//!
//! | File      | Key    | Tag     | EN     | ES                                   | FR  |
//! |-----------|--------|---------|--------|--------------------------------------|-----|
//! | auth.json | failed | default | Failed | =GOOGLETRANSLATE(D2, "en", "es")     | ... |
//!
//! Every write replaces the whole sheet: the header grows by one column per new
//! target locale, rows are matched by `file|key|tag`, rows of other files and
//! tags are carried over, and the target-locale formula of *every* row is
//! regenerated for its final position.

use crate::Result;
use sheetloc_core::{Entry, RowKey, FIXED_HEADER, SOURCE_COLUMN};
use sheetloc_sheets::{a1, literal_input, translate_formula, SheetsApi, ValueRender};
use std::collections::HashMap;

/// Header plus data rows as read from the sheet (formulas as text).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetSnapshot {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetSnapshot {
    pub fn from_values(mut values: Vec<Vec<String>>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let rows = values.split_off(1);
        let header = values.pop().unwrap_or_default();
        Self { header, rows }
    }
}

/// Full content to write back plus bookkeeping for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetPlan {
    pub header: Vec<String>,
    /// Rows of this run first, then retained rows, each at least `header.len()` wide.
    pub rows: Vec<Vec<String>>,
    pub target_column: usize,
    pub created: usize,
    pub reused: usize,
    pub retained: usize,
}

impl SheetPlan {
    /// Cells as user-entered input. File, key, tag and source text are quoted
    /// when they would otherwise be parsed as formulas.
    pub fn to_values(&self) -> Vec<Vec<String>> {
        let mut all = Vec::with_capacity(self.rows.len() + 1);
        all.push(self.header.clone());
        all.extend(self.rows.iter().map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| {
                    if i <= SOURCE_COLUMN {
                        literal_input(cell)
                    } else {
                        cell.clone()
                    }
                })
                .collect()
        }));
        all
    }
}

/// Widen `row` to `width`; cells past the header are kept.
fn pad(row: &mut Vec<String>, width: usize) {
    if row.len() < width {
        row.resize(width, String::new());
    }
}

/// Merge `entries` into `snapshot` for one source/target locale pair.
pub fn plan_upsert(
    snapshot: SheetSnapshot,
    entries: &[Entry],
    source_locale: &str,
    target_locale: &str,
) -> SheetPlan {
    let source_upper = source_locale.to_uppercase();
    let target_upper = target_locale.to_uppercase();

    let mut header = snapshot.header;
    let defaults = [
        FIXED_HEADER[0].to_string(),
        FIXED_HEADER[1].to_string(),
        FIXED_HEADER[2].to_string(),
        source_upper,
    ];
    while header.len() <= SOURCE_COLUMN {
        header.push(defaults[header.len()].clone());
    }
    let target_column = match header.iter().position(|h| *h == target_upper) {
        Some(i) => i,
        None => {
            header.push(target_upper);
            header.len() - 1
        }
    };
    let width = header.len();

    // Existing rows in sheet order; a duplicated key keeps its first slot and the last content.
    let mut existing: Vec<Option<Vec<String>>> = Vec::new();
    let mut by_key: HashMap<RowKey, usize> = HashMap::new();
    for row in snapshot.rows {
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        let key = RowKey::from_cells(&row);
        match by_key.get(&key) {
            Some(&i) => existing[i] = Some(row),
            None => {
                by_key.insert(key, existing.len());
                existing.push(Some(row));
            }
        }
    }

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(entries.len() + existing.len());
    let mut processed: HashMap<RowKey, usize> = HashMap::new();
    let (mut created, mut reused) = (0, 0);
    for entry in entries {
        let key = entry.row_key();
        if let Some(&i) = processed.get(&key) {
            rows[i][SOURCE_COLUMN] = entry.source_text.clone();
            continue;
        }
        let claimed = by_key.remove(&key).and_then(|i| existing[i].take());
        let row = match claimed {
            Some(mut row) => {
                pad(&mut row, width);
                row[SOURCE_COLUMN] = entry.source_text.clone();
                reused += 1;
                row
            }
            None => {
                let mut row = vec![String::new(); width];
                row[0] = entry.file.clone();
                row[1] = entry.key.clone();
                row[2] = entry.tag.clone();
                row[SOURCE_COLUMN] = entry.source_text.clone();
                created += 1;
                row
            }
        };
        processed.insert(key, rows.len());
        rows.push(row);
    }

    let mut retained = 0;
    for mut row in existing.into_iter().flatten() {
        pad(&mut row, width);
        rows.push(row);
        retained += 1;
    }

    for (i, row) in rows.iter_mut().enumerate() {
        // +2: one for the header row, one because sheet rows are 1-based.
        row[target_column] = translate_formula(i + 2, source_locale, target_locale);
    }

    SheetPlan {
        header,
        rows,
        target_column,
        created,
        reused,
        retained,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertReport {
    pub created: usize,
    pub reused: usize,
    pub retained: usize,
    pub target_column: usize,
}

/// Writes translation requests into a sheet. Assumes a single writer per sheet.
pub struct SheetReconciler<'a, A: ?Sized> {
    api: &'a A,
}

impl<'a, A: SheetsApi + ?Sized> SheetReconciler<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Create the sheet if it is missing. Returns true when it was created.
    pub fn ensure_sheet(&self, title: &str) -> Result<bool> {
        let meta = self.api.spreadsheet()?;
        if meta.sheets.iter().any(|s| s.title == title) {
            return Ok(false);
        }
        tracing::info!(event = "sheet_created", sheet = title);
        self.api.add_sheet(title)?;
        Ok(true)
    }

    /// Current content with formulas as literal text.
    pub fn fetch(&self, title: &str) -> Result<SheetSnapshot> {
        let values = self
            .api
            .get_values(&a1::whole_sheet(title), ValueRender::Formula)?;
        Ok(SheetSnapshot::from_values(values))
    }

    pub fn upsert(
        &self,
        entries: &[Entry],
        source_locale: &str,
        target_locale: &str,
        sheet: &str,
    ) -> Result<UpsertReport> {
        self.ensure_sheet(sheet)?;
        let snapshot = self.fetch(sheet)?;
        let plan = plan_upsert(snapshot, entries, source_locale, target_locale);
        tracing::debug!(
            event = "upsert_plan",
            sheet = sheet,
            created = plan.created,
            reused = plan.reused,
            retained = plan.retained,
            target_column = plan.target_column
        );

        self.api.clear_values(&a1::whole_sheet(sheet))?;
        self.api
            .update_values(&a1::sheet_range(sheet, "A1"), &plan.to_values())?;

        Ok(UpsertReport {
            created: plan.created,
            reused: plan.reused,
            retained: plan.retained,
            target_column: plan.target_column,
        })
    }
}
