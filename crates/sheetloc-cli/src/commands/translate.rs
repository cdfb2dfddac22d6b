use super::{print_json, Context, OutputFormat};
use color_eyre::eyre::{eyre, Result};
use owo_colors::OwoColorize;
use sheetloc_domain::RunSummary;
use sheetloc_services::TranslateRequest;
use sheetloc_store::LangStore;
use std::path::PathBuf;

pub struct TranslateArgs {
    pub target: String,
    pub source: Option<String>,
    pub tag: Option<String>,
    pub sheet: Option<String>,
    pub lang_dir: Option<PathBuf>,
}

pub fn run_translate(ctx: &Context, args: TranslateArgs, format: OutputFormat) -> Result<()> {
    let cfg = ctx.load_config()?;
    let source = args.source.clone().unwrap_or_else(|| cfg.source_locale.clone());
    sheetloc_services::validate_locales(&source, &args.target)?;

    let client = ctx.connect(&cfg)?;
    let store = LangStore::new(args.lang_dir.unwrap_or_else(|| cfg.lang_dir.clone()));
    let request = TranslateRequest {
        target_locale: args.target,
        source_locale: args.source,
        tag: args.tag,
        sheet: args.sheet,
    };
    let summary = sheetloc_services::run_translate(&client, &cfg, &store, &request)?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => print_summary(&summary, ctx.use_color),
    }

    let failed = summary.failed_files().count();
    if failed > 0 {
        return Err(eyre!("{failed} of {} file(s) failed", summary.files_processed));
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, use_color: bool) {
    println!(
        "{:<8} {}\n{:<8} {}\n{:<8} {}\n{:<8} {}",
        "Source",
        summary.source_locale.to_uppercase(),
        "Target",
        summary.target_locale.to_uppercase(),
        "Sheet",
        summary.sheet,
        "Tag",
        summary.tag
    );
    println!();
    for f in &summary.files {
        let status = match (f.status.as_str(), use_color) {
            ("translated", true) => format!("{}", f.status.green()),
            ("failed", true) => format!("{}", f.status.red()),
            (_, true) => format!("{}", f.status.yellow()),
            (_, false) => f.status.clone(),
        };
        println!("  {:<32} {:>6}  {}", f.file, f.strings, status);
        if let Some(msg) = &f.message {
            for line in msg.lines() {
                println!("      {line}");
            }
        }
    }
    println!();
    crate::ui_ok!(
        "Translated {} string(s) in {} file(s)",
        summary.strings_translated,
        summary.files_processed
    );
}
