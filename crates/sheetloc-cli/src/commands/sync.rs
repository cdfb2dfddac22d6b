use super::{print_json, Context, OutputFormat};
use color_eyre::eyre::{eyre, Result};
use owo_colors::OwoColorize;
use sheetloc_services::JobRequest;
use sheetloc_store::LangStore;
use std::path::PathBuf;

pub struct SyncArgs {
    pub locales: String,
    pub source: Option<String>,
    pub tag: Option<String>,
    pub sheet: Option<String>,
    pub lang_dir: Option<PathBuf>,
}

pub fn run_sync(ctx: &Context, args: SyncArgs, format: OutputFormat) -> Result<()> {
    if sheetloc_services::split_locales(&args.locales).is_empty() {
        return Err(eyre!("--locales must name at least one locale"));
    }
    let cfg = ctx.load_config()?;
    let client = ctx.connect(&cfg)?;
    let store = LangStore::new(args.lang_dir.unwrap_or_else(|| cfg.lang_dir.clone()));
    let report = sheetloc_services::run_locales(
        &client,
        &cfg,
        &store,
        &JobRequest {
            locales: args.locales,
            source_locale: args.source,
            tag: args.tag,
            sheet: args.sheet,
        },
    )?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            print!("{}", report.output);
            if !report.success {
                crate::ui_err!("{}", report.message);
            } else if ctx.use_color {
                println!("{}", report.message.green());
            } else {
                println!("{}", report.message);
            }
        }
    }

    if !report.success {
        return Err(eyre!("{}", report.message));
    }
    Ok(())
}
