use crate::orchestrate::{FileJob, SyncOrchestrator, SyncSettings};
use crate::Result;
use color_eyre::eyre::eyre;
use sheetloc_config::SyncConfig;
use sheetloc_core::DEFAULT_TAG;
use sheetloc_domain::{FileReport, JobReport, LocaleRun, RunSummary, SCHEMA_VERSION};
use sheetloc_sheets::SheetsApi;
use sheetloc_store::{LangStore, SourceFile};
use std::fmt::Write as _;

#[derive(Debug, Clone, Default)]
pub struct TranslateRequest {
    pub target_locale: String,
    /// Falls back to the configured source locale.
    pub source_locale: Option<String>,
    pub tag: Option<String>,
    /// Falls back to today's date.
    pub sheet: Option<String>,
}

/// Sheet title used when none is given: the local date, `YYYY-MM-DD`.
pub fn default_sheet_name() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Translate every source file of the source locale into `req.target_locale`.
///
/// A failing file is recorded in the summary and does not stop the others.
pub fn run_translate<A: SheetsApi + ?Sized>(
    api: &A,
    cfg: &SyncConfig,
    store: &LangStore,
    req: &TranslateRequest,
) -> Result<RunSummary> {
    let mut settings = SyncSettings::from(cfg);
    if let Some(src) = req.source_locale.as_deref().filter(|s| !s.trim().is_empty()) {
        settings.source_locale = src.trim().to_string();
    }
    let target = req.target_locale.trim().to_string();
    crate::orchestrate::validate_locales(&settings.source_locale, &target)?;
    let tag = req
        .tag
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TAG)
        .to_string();
    let sheet = req
        .sheet
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(default_sheet_name);

    let files = store.source_files(&settings.source_locale)?;
    if files.is_empty() {
        return Err(eyre!(
            "no language files found for locale '{}' in {}",
            settings.source_locale,
            store.root().display()
        ));
    }
    tracing::info!(
        event = "translate_start",
        source = %settings.source_locale,
        target = %target,
        sheet = %sheet,
        tag = %tag,
        files = files.len()
    );

    let source_locale = settings.source_locale.clone();
    let orchestrator = SyncOrchestrator::new(api, settings);
    let mut reports = Vec::with_capacity(files.len());
    let mut strings_translated = 0;
    for file in &files {
        let job = FileJob {
            file: &file.name,
            tag: &tag,
            sheet: &sheet,
            target_locale: &target,
        };
        let report = match translate_one(&orchestrator, store, file, &job) {
            Ok(0) => FileReport {
                file: file.name.clone(),
                strings: 0,
                status: "empty".into(),
                message: None,
            },
            Ok(n) => {
                strings_translated += n;
                FileReport {
                    file: file.name.clone(),
                    strings: n,
                    status: "translated".into(),
                    message: None,
                }
            }
            Err(e) => {
                tracing::error!(event = "file_failed", file = %file.name, error = %e);
                FileReport {
                    file: file.name.clone(),
                    strings: 0,
                    status: "failed".into(),
                    message: Some(e.to_string()),
                }
            }
        };
        reports.push(report);
    }

    Ok(RunSummary {
        schema_version: SCHEMA_VERSION,
        source_locale,
        target_locale: target,
        sheet,
        tag,
        files_processed: files.len(),
        strings_translated,
        files: reports,
    })
}

fn translate_one<A: SheetsApi + ?Sized>(
    orchestrator: &SyncOrchestrator<'_, A>,
    store: &LangStore,
    file: &SourceFile,
    job: &FileJob<'_>,
) -> Result<usize> {
    let loaded = store.load_strings(file)?;
    for skipped in &loaded.skipped {
        tracing::warn!(event = "string_skipped", file = %file.name, reason = %skipped);
    }
    if loaded.strings.is_empty() {
        tracing::warn!(event = "no_strings", file = %file.name);
        return Ok(0);
    }
    let translated = orchestrator.translate_file(job, &loaded.strings)?;
    if translated.is_empty() {
        tracing::warn!(event = "no_translations", file = %file.name);
        return Ok(0);
    }
    store.save_translations(file, job.target_locale, &translated)?;
    Ok(translated.len())
}

/// Split a comma-separated locale list, dropping blanks and duplicates.
pub fn split_locales(list: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for l in list.split(',').map(str::trim).filter(|l| !l.is_empty()) {
        if !out.iter().any(|o| o.eq_ignore_ascii_case(l)) {
            out.push(l.to_string());
        }
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct JobRequest {
    /// Comma-separated target locales, e.g. `es,fr`.
    pub locales: String,
    pub source_locale: Option<String>,
    pub tag: Option<String>,
    pub sheet: Option<String>,
}

/// Run [`run_translate`] for each requested locale on one shared sheet and
/// collect a textual log of the whole job.
pub fn run_locales<A: SheetsApi + ?Sized>(
    api: &A,
    cfg: &SyncConfig,
    store: &LangStore,
    req: &JobRequest,
) -> Result<JobReport> {
    let locales = split_locales(&req.locales);
    if locales.is_empty() {
        return Err(eyre!("no target locales given"));
    }
    let sheet = req
        .sheet
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(default_sheet_name);

    let mut output = String::new();
    let _ = writeln!(output, "Using sheet: {sheet}");
    let mut runs = Vec::with_capacity(locales.len());
    for locale in &locales {
        let _ = writeln!(output, "> Processing locale: {locale}...");
        let request = TranslateRequest {
            target_locale: locale.clone(),
            source_locale: req.source_locale.clone(),
            tag: req.tag.clone(),
            sheet: Some(sheet.clone()),
        };
        let run = match run_translate(api, cfg, store, &request) {
            Ok(summary) => {
                let _ = writeln!(
                    output,
                    "Translated {} string(s) in {} file(s) into {}",
                    summary.strings_translated,
                    summary.files_processed,
                    locale.to_uppercase()
                );
                for failed in summary.failed_files() {
                    let _ = writeln!(
                        output,
                        "  {} failed: {}",
                        failed.file,
                        failed.message.as_deref().unwrap_or("unknown error")
                    );
                }
                LocaleRun {
                    locale: locale.clone(),
                    success: summary.is_success(),
                    summary: Some(summary),
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(event = "locale_failed", locale = %locale, error = %e);
                let _ = writeln!(output, "Error: {e}");
                LocaleRun {
                    locale: locale.clone(),
                    success: false,
                    summary: None,
                    error: Some(e.to_string()),
                }
            }
        };
        runs.push(run);
    }

    let success = runs.iter().all(|r| r.success);
    let message = if success {
        format!("Translation completed for: {}", locales.join(", "))
    } else {
        "Translation failed for one or more locales".to_string()
    };
    Ok(JobReport {
        schema_version: SCHEMA_VERSION,
        success,
        message,
        output,
        runs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetloc_sheets::MemorySheets;
    use std::fs;
    use std::time::Duration;

    fn config(dir: &std::path::Path) -> SyncConfig {
        SyncConfig {
            lang_dir: dir.to_path_buf(),
            poll_interval: Duration::ZERO,
            poll_max_attempts: 3,
            ..SyncConfig::default()
        }
    }

    fn read(path: &std::path::Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn translates_flat_and_nested_files_and_merges_targets() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("en.json"), r#"{"welcome": "Hello :name", "bye": "Bye"}"#).unwrap();
        fs::create_dir_all(dir.path().join("en")).unwrap();
        fs::write(dir.path().join("en/auth.json"), r#"{"login": {"failed": "Failed"}}"#).unwrap();
        fs::write(dir.path().join("es.json"), r#"{"kept": "conservado", "bye": "old"}"#).unwrap();

        let sheets = MemorySheets::with_evaluator(|call| {
            format!("[{}] {}", call.target_locale, call.text)
        });
        let cfg = config(dir.path());
        let store = LangStore::new(dir.path());
        let summary = run_translate(
            &sheets,
            &cfg,
            &store,
            &TranslateRequest {
                target_locale: "es".into(),
                sheet: Some("run".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(summary.is_success());
        assert_eq!(summary.files_processed, 2);
        assert_eq!(summary.strings_translated, 3);
        assert_eq!(summary.tag, DEFAULT_TAG);

        let flat = read(&dir.path().join("es.json"));
        assert_eq!(flat["welcome"], "[es] Hello :name");
        assert_eq!(flat["bye"], "[es] Bye");
        assert_eq!(flat["kept"], "conservado");

        let nested = read(&dir.path().join("es/auth.json"));
        assert_eq!(nested["login"]["failed"], "[es] Failed");
    }

    #[test]
    fn a_failing_file_does_not_stop_the_others() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("en")).unwrap();
        fs::write(dir.path().join("en/a.json"), r#"{"x": "Broken"}"#).unwrap();
        fs::write(dir.path().join("en/b.json"), r#"{"y": "Fine"}"#).unwrap();
        let sheets = MemorySheets::with_evaluator(|call| {
            if call.text == "Broken" { "#N/A".into() } else { call.text.to_uppercase() }
        });
        let summary = run_translate(
            &sheets,
            &config(dir.path()),
            &LangStore::new(dir.path()),
            &TranslateRequest {
                target_locale: "de".into(),
                sheet: Some("s".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!summary.is_success());
        let statuses: Vec<&str> = summary.files.iter().map(|f| f.status.as_str()).collect();
        assert_eq!(statuses, vec!["failed", "translated"]);
        assert!(!dir.path().join("de/a.json").exists());
        assert_eq!(read(&dir.path().join("de/b.json"))["y"], "FINE");
    }

    #[test]
    fn missing_source_files_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_translate(
            &MemorySheets::new(),
            &config(dir.path()),
            &LangStore::new(dir.path()),
            &TranslateRequest {
                target_locale: "es".into(),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("no language files found"));
    }

    #[test]
    fn locale_job_shares_one_sheet_and_reports_each_locale() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("en.json"), r#"{"hi": "Hi"}"#).unwrap();
        let sheets = MemorySheets::new();
        let report = run_locales(
            &sheets,
            &config(dir.path()),
            &LangStore::new(dir.path()),
            &JobRequest {
                locales: "es, fr,,ES".into(),
                sheet: Some("job".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(report.success);
        assert_eq!(report.runs.len(), 2);
        assert_eq!(report.message, "Translation completed for: es, fr");
        assert!(report.output.contains("> Processing locale: fr..."));
        assert_eq!(sheets.spreadsheet().unwrap().sheets.len(), 1);
        assert!(dir.path().join("fr.json").exists());
    }

    #[test]
    fn locale_job_records_per_locale_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("en.json"), r#"{"hi": "Hi"}"#).unwrap();
        let report = run_locales(
            &MemorySheets::new(),
            &config(dir.path()),
            &LangStore::new(dir.path()),
            &JobRequest {
                locales: "en,es".into(),
                sheet: Some("job".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!report.success);
        assert!(report.runs[0].error.as_deref().unwrap().contains("invalid locale"));
        assert!(report.runs[1].success);
    }

    #[test]
    fn split_locales_trims_and_dedupes() {
        assert_eq!(split_locales(" es ,fr,ES,, de"), vec!["es", "fr", "de"]);
        assert!(split_locales(" , ").is_empty());
    }
}
