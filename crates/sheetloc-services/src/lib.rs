//! Synchronization engine: sheet reconciliation, polling and per-file runs.

pub mod orchestrate;
pub mod poll;
pub mod reconcile;
pub mod run;
pub mod status;

pub use orchestrate::{validate_locales, FileJob, SyncOrchestrator, SyncSettings};
pub use poll::{classify_snapshot, PollOutcome, TranslationPoller};
pub use reconcile::{plan_upsert, SheetPlan, SheetReconciler, SheetSnapshot, UpsertReport};
pub use run::{default_sheet_name, run_locales, run_translate, split_locales, JobRequest, TranslateRequest};
pub use sheetloc_core::Result;
pub use status::{list_sheets, status};
