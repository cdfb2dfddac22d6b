use crate::Result;
use sheetloc_config::SyncConfig;
use sheetloc_domain::{LocaleCoverage, SheetSummary, StatusReport, SCHEMA_VERSION};
use sheetloc_sheets::SheetsApi;
use sheetloc_store::LangStore;

/// Sheets of the spreadsheet, most recently added (highest index) first.
pub fn list_sheets<A: SheetsApi + ?Sized>(api: &A) -> Result<Vec<SheetSummary>> {
    let meta = api.spreadsheet()?;
    let mut sheets: Vec<SheetSummary> = meta
        .sheets
        .into_iter()
        .map(|s| SheetSummary {
            id: s.sheet_id,
            title: s.title,
            index: s.index,
            rows: s.row_count,
            columns: s.column_count,
        })
        .collect();
    sheets.sort_by(|a, b| b.index.cmp(&a.index));
    Ok(sheets)
}

/// Local configuration and translation coverage; never touches the network.
pub fn status(cfg: &SyncConfig, store: &LangStore) -> Result<StatusReport> {
    let source = &cfg.source_locale;
    let locales = store.locales()?;
    let mut source_files = 0;
    let mut source_strings = 0;
    for file in store.source_files(source)? {
        source_files += 1;
        source_strings += store.load_strings(&file)?.strings.len();
    }
    let mut coverage = Vec::new();
    for locale in locales.iter().filter(|l| !l.eq_ignore_ascii_case(source)) {
        let c = store.coverage(source, locale)?;
        coverage.push(LocaleCoverage {
            locale: locale.clone(),
            translated: c.translated,
            total: c.total,
            percentage: percentage(c.translated, c.total),
        });
    }

    Ok(StatusReport {
        schema_version: SCHEMA_VERSION,
        configured: cfg.is_configured() && cfg.credentials.is_some(),
        spreadsheet_id: cfg.spreadsheet_id.clone(),
        credentials: cfg
            .credentials
            .as_ref()
            .map_or("none", |c| c.kind())
            .to_string(),
        source_locale: source.clone(),
        lang_dir: cfg.lang_dir.display().to_string(),
        poll_interval_secs: cfg.poll_interval.as_secs(),
        poll_max_attempts: cfg.poll_max_attempts,
        source_files,
        source_strings,
        locales,
        coverage,
    })
}

fn percentage(translated: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (translated as f64 / total as f64 * 1000.0).round() / 10.0
}
