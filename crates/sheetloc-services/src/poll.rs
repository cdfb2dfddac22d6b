use crate::Result;
use sheetloc_core::{StringMap, SyncError};
use sheetloc_sheets::{a1, is_error_marker, SheetsApi, ValueRender, LOADING_MARKER};
use std::time::Duration;

/// State of one file's translation cells in a single evaluated snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Loading,
    Complete(StringMap),
    Failed(Vec<String>),
}

/// Classify an evaluated snapshot (header row first) for the rows of `filename`.
///
/// Error cells win over pending ones: a single `#REF!` fails the file even if
/// other cells still show `Loading...`. A snapshot with no matching rows is
/// treated as pending. When a key appears under several tags, the topmost row wins.
pub fn classify_snapshot(
    values: &[Vec<String>],
    target_locale: &str,
    filename: &str,
) -> std::result::Result<PollOutcome, SyncError> {
    let Some((header, rows)) = values.split_first() else {
        return Ok(PollOutcome::Loading);
    };
    let target_upper = target_locale.to_uppercase();
    let column = header
        .iter()
        .position(|h| *h == target_upper)
        .ok_or(SyncError::ColumnNotFound(target_upper))?;

    let mut translations = StringMap::new();
    let mut errors = Vec::new();
    let mut pending = false;
    for row in rows {
        if row.first().map(String::as_str) != Some(filename) {
            continue;
        }
        let key = row.get(1).map(String::as_str).unwrap_or("");
        let value = row.get(column).map(String::as_str).unwrap_or("");
        if is_error_marker(value) {
            errors.push(format!("Key '{key}' returned error: {value}"));
            continue;
        }
        if value.is_empty() || value == LOADING_MARKER {
            pending = true;
            break;
        }
        // Rows of the current run sit above retained ones, so the first hit for a key wins.
        translations
            .entry(key.to_string())
            .or_insert_with(|| value.to_string());
    }

    if !errors.is_empty() {
        return Ok(PollOutcome::Failed(errors));
    }
    if pending || translations.is_empty() {
        return Ok(PollOutcome::Loading);
    }
    Ok(PollOutcome::Complete(translations))
}

/// Re-reads evaluated values until a file's translations settle.
pub struct TranslationPoller<'a, A: ?Sized> {
    api: &'a A,
    max_attempts: u32,
    interval: Duration,
}

impl<'a, A: SheetsApi + ?Sized> TranslationPoller<'a, A> {
    pub fn new(api: &'a A, max_attempts: u32, interval: Duration) -> Self {
        Self {
            api,
            max_attempts,
            interval,
        }
    }

    /// Translated values of `filename` keyed by string key.
    ///
    /// Fails fast on error cells or a missing target column. Otherwise reads at
    /// most `max_attempts` times, sleeping `interval` between reads.
    pub fn poll(&self, sheet: &str, target_locale: &str, filename: &str) -> Result<StringMap> {
        let range = a1::whole_sheet(sheet);
        for attempt in 1..=self.max_attempts {
            let values = self.api.get_values(&range, ValueRender::Formatted)?;
            match classify_snapshot(&values, target_locale, filename)? {
                PollOutcome::Complete(map) => {
                    tracing::debug!(event = "poll_complete", file = filename, attempt, strings = map.len());
                    return Ok(map);
                }
                PollOutcome::Failed(errors) => {
                    return Err(SyncError::TranslationCells { errors }.into());
                }
                PollOutcome::Loading => {
                    tracing::debug!(event = "poll_pending", file = filename, attempt, max = self.max_attempts);
                    if attempt < self.max_attempts && !self.interval.is_zero() {
                        std::thread::sleep(self.interval);
                    }
                }
            }
        }
        Err(SyncError::PollTimeout {
            attempts: self.max_attempts,
            interval_secs: self.interval.as_secs(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetloc_sheets::MemorySheets;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn header() -> Vec<String> {
        row(&["File", "Key", "Tag", "EN", "ES"])
    }

    #[test]
    fn complete_when_every_row_of_the_file_is_translated() {
        let values = vec![
            header(),
            row(&["auth.json", "failed", "default", "Failed", "Fallido"]),
            row(&["other.json", "x", "default", "X", "Loading..."]),
            row(&["auth.json", "throttle", "default", "Too many", "Demasiados"]),
        ];
        let outcome = classify_snapshot(&values, "es", "auth.json").unwrap();
        let mut expected = StringMap::new();
        expected.insert("failed".into(), "Fallido".into());
        expected.insert("throttle".into(), "Demasiados".into());
        assert_eq!(outcome, PollOutcome::Complete(expected));
    }

    #[test]
    fn loading_or_empty_cells_keep_polling() {
        let loading = vec![header(), row(&["a.json", "k", "default", "Hi", "Loading..."])];
        assert_eq!(classify_snapshot(&loading, "es", "a.json").unwrap(), PollOutcome::Loading);
        let empty = vec![header(), row(&["a.json", "k", "default", "Hi"])];
        assert_eq!(classify_snapshot(&empty, "es", "a.json").unwrap(), PollOutcome::Loading);
        assert_eq!(classify_snapshot(&[], "es", "a.json").unwrap(), PollOutcome::Loading);
        let unrelated = vec![header(), row(&["b.json", "k", "default", "Hi", "Hola"])];
        assert_eq!(classify_snapshot(&unrelated, "es", "a.json").unwrap(), PollOutcome::Loading);
    }

    #[test]
    fn errors_take_precedence_over_loading() {
        let values = vec![
            header(),
            row(&["a.json", "k1", "default", "One", "Loading..."]),
            row(&["a.json", "k2", "default", "Two", "#VALUE!"]),
        ];
        // A pending cell ends the scan, so only errors above it count.
        assert_eq!(classify_snapshot(&values, "es", "a.json").unwrap(), PollOutcome::Loading);

        let values = vec![
            header(),
            row(&["a.json", "k2", "default", "Two", "#VALUE!"]),
            row(&["a.json", "k1", "default", "One", "Loading..."]),
        ];
        assert_eq!(
            classify_snapshot(&values, "es", "a.json").unwrap(),
            PollOutcome::Failed(vec!["Key 'k2' returned error: #VALUE!".into()])
        );
    }

    #[test]
    fn topmost_row_wins_for_a_key_under_several_tags() {
        let values = vec![
            header(),
            row(&["a.json", "k", "v2", "Hello there", "Hola"]),
            row(&["a.json", "k", "default", "Hello", "Buenas"]),
        ];
        let mut expected = StringMap::new();
        expected.insert("k".into(), "Hola".into());
        assert_eq!(
            classify_snapshot(&values, "es", "a.json").unwrap(),
            PollOutcome::Complete(expected)
        );
    }

    #[test]
    fn missing_target_column_is_column_not_found() {
        let values = vec![header()];
        let err = classify_snapshot(&values, "fr", "a.json").unwrap_err();
        assert!(matches!(err, SyncError::ColumnNotFound(c) if c == "FR"));
    }

    #[test]
    fn poll_terminates_after_pending_reads() {
        // Reads 1..=3 show Loading; the fourth resolves.
        let k = 3;
        for (max_attempts, should_succeed) in [(k, false), (k + 1, true), (k + 5, true)] {
            let sheets = MemorySheets::with_evaluator(move |call| {
                if call.read <= k as usize {
                    "Loading...".into()
                } else {
                    format!("{}!", call.text)
                }
            });
            sheets.seed(
                "s",
                vec![header(), row(&["a.json", "k", "default", "Hi", "=GOOGLETRANSLATE(D2, \"en\", \"es\")"])],
            );
            let poller = TranslationPoller::new(&sheets, max_attempts, Duration::ZERO);
            let result = poller.poll("s", "es", "a.json");
            if should_succeed {
                assert_eq!(result.unwrap().get("k").map(String::as_str), Some("Hi!"));
                assert_eq!(sheets.value_reads(), k as usize + 1);
            } else {
                let err = result.unwrap_err();
                assert!(matches!(
                    err.downcast_ref::<SyncError>(),
                    Some(SyncError::PollTimeout { attempts: 3, .. })
                ));
                assert_eq!(sheets.value_reads(), k as usize);
            }
        }
    }

    #[test]
    fn error_cell_fails_on_first_read() {
        let sheets = MemorySheets::with_evaluator(|_| "#REF!".into());
        sheets.seed(
            "s",
            vec![header(), row(&["a.json", "k", "default", "Hi", "=GOOGLETRANSLATE(D2, \"en\", \"es\")"])],
        );
        let err = TranslationPoller::new(&sheets, 10, Duration::ZERO)
            .poll("s", "es", "a.json")
            .unwrap_err();
        match err.downcast_ref::<SyncError>() {
            Some(SyncError::TranslationCells { errors }) => {
                assert_eq!(errors, &vec!["Key 'k' returned error: #REF!".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(sheets.value_reads(), 1);
    }

    #[test]
    fn missing_column_is_not_retried() {
        let sheets = MemorySheets::new();
        sheets.seed("s", vec![header()]);
        let err = TranslationPoller::new(&sheets, 10, Duration::ZERO)
            .poll("s", "de", "a.json")
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::ColumnNotFound(c)) if c == "DE"
        ));
        assert_eq!(sheets.value_reads(), 1);
    }
}
