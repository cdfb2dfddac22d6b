use super::{print_json, Context, OutputFormat};
use color_eyre::eyre::Result;
use owo_colors::OwoColorize;
use sheetloc_store::LangStore;

pub fn run_status(ctx: &Context, format: OutputFormat) -> Result<()> {
    let cfg = ctx.load_config()?;
    let store = LangStore::new(cfg.lang_dir.clone());
    let report = sheetloc_services::status(&cfg, &store)?;

    if format == OutputFormat::Json {
        return print_json(&report);
    }
    let state = match (report.configured, ctx.use_color) {
        (true, true) => format!("{}", "configured".green()),
        (false, true) => format!("{}", "not configured".red()),
        (true, false) => "configured".to_string(),
        (false, false) => "not configured".to_string(),
    };
    println!("Status:         {state}");
    println!(
        "Spreadsheet:    {}",
        report.spreadsheet_id.as_deref().unwrap_or("-")
    );
    println!("Credentials:    {}", report.credentials);
    println!("Source locale:  {}", report.source_locale);
    println!("Language dir:   {}", report.lang_dir);
    println!(
        "Polling:        every {}s, up to {} attempt(s)",
        report.poll_interval_secs, report.poll_max_attempts
    );
    println!(
        "Source strings: {} in {} file(s)",
        report.source_strings, report.source_files
    );
    if report.coverage.is_empty() {
        println!("Locales:        none besides {}", report.source_locale);
    }
    for c in &report.coverage {
        let pct = format!("{:>5.1}%", c.percentage);
        let pct = match (ctx.use_color, c.translated == c.total && c.total > 0) {
            (true, true) => format!("{}", pct.green()),
            (true, false) => format!("{}", pct.yellow()),
            (false, _) => pct,
        };
        println!("  {:<12} {pct}  {}/{}", c.locale, c.translated, c.total);
    }
    if !report.configured {
        crate::ui_info!("Set spreadsheet_id and [credentials] in sheetloc.toml to enable translation");
    }
    Ok(())
}
