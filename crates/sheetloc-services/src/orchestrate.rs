use crate::poll::TranslationPoller;
use crate::reconcile::SheetReconciler;
use crate::Result;
use sheetloc_config::SyncConfig;
use sheetloc_core::{Entry, MaskResult, StringMap, SyncError};
use sheetloc_mask::PlaceholderCodec;
use sheetloc_sheets::SheetsApi;
use std::collections::BTreeMap;
use std::time::Duration;

/// Knobs of a translation run that do not change between files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub source_locale: String,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
}

impl From<&SyncConfig> for SyncSettings {
    fn from(cfg: &SyncConfig) -> Self {
        Self {
            source_locale: cfg.source_locale.clone(),
            poll_interval: cfg.poll_interval,
            poll_max_attempts: cfg.poll_max_attempts,
        }
    }
}

/// One file translated into one locale on one sheet.
#[derive(Debug, Clone, Copy)]
pub struct FileJob<'s> {
    pub file: &'s str,
    pub tag: &'s str,
    pub sheet: &'s str,
    pub target_locale: &'s str,
}

/// Drives mask, upsert, poll and unmask for a single source file.
pub struct SyncOrchestrator<'a, A: ?Sized> {
    api: &'a A,
    codec: PlaceholderCodec,
    settings: SyncSettings,
}

impl<'a, A: SheetsApi + ?Sized> SyncOrchestrator<'a, A> {
    pub fn new(api: &'a A, settings: SyncSettings) -> Self {
        Self {
            api,
            codec: PlaceholderCodec,
            settings,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Translate `strings` (flat key to source text) and return key to translated text.
    ///
    /// Keys whose translation never showed up are dropped with a warning.
    pub fn translate_file(&self, job: &FileJob<'_>, strings: &StringMap) -> Result<StringMap> {
        validate_locales(&self.settings.source_locale, job.target_locale)?;
        if strings.is_empty() {
            return Ok(StringMap::new());
        }

        let mut masks: BTreeMap<&str, MaskResult> = BTreeMap::new();
        let mut entries = Vec::with_capacity(strings.len());
        for (key, text) in strings {
            let masked = self.codec.mask(text);
            entries.push(Entry {
                file: job.file.to_string(),
                key: key.clone(),
                tag: job.tag.to_string(),
                source_text: masked.masked_text.clone(),
            });
            masks.insert(key.as_str(), masked);
        }

        tracing::info!(
            event = "upload",
            file = job.file,
            strings = entries.len(),
            sheet = job.sheet,
            target = job.target_locale
        );
        SheetReconciler::new(self.api).upsert(
            &entries,
            &self.settings.source_locale,
            job.target_locale,
            job.sheet,
        )?;

        let translated = TranslationPoller::new(
            self.api,
            self.settings.poll_max_attempts,
            self.settings.poll_interval,
        )
        .poll(job.sheet, job.target_locale, job.file)?;

        let mut out = StringMap::new();
        for (key, mask) in &masks {
            match translated.get(*key) {
                Some(value) => {
                    out.insert(key.to_string(), self.codec.unmask(value, &mask.placeholders));
                }
                None => tracing::warn!(event = "translation_missing", file = job.file, key = *key),
            }
        }
        let foreign = translated.keys().filter(|k| !masks.contains_key(k.as_str())).count();
        if foreign > 0 {
            tracing::debug!(event = "ignored_rows", file = job.file, count = foreign);
        }
        Ok(out)
    }
}

/// Both locales must be non-blank and differ (case-insensitively).
pub fn validate_locales(source: &str, target: &str) -> std::result::Result<(), SyncError> {
    let (source, target) = (source.trim(), target.trim());
    if source.is_empty() {
        return Err(SyncError::InvalidLocale("source locale is empty".into()));
    }
    if target.is_empty() {
        return Err(SyncError::InvalidLocale("target locale is empty".into()));
    }
    if source.eq_ignore_ascii_case(target) {
        return Err(SyncError::InvalidLocale(format!(
            "target locale '{target}' equals the source locale"
        )));
    }
    Ok(())
}
