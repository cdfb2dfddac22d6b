use super::{print_json, Context, OutputFormat};
use color_eyre::eyre::Result;
use owo_colors::OwoColorize;

pub fn run_sheets(ctx: &Context, format: OutputFormat) -> Result<()> {
    let cfg = ctx.load_config()?;
    let client = ctx.connect(&cfg)?;
    let sheets = sheetloc_services::list_sheets(&client)?;

    if format == OutputFormat::Json {
        return print_json(&sheets);
    }
    if sheets.is_empty() {
        crate::ui_warn!("The spreadsheet has no sheets");
        return Ok(());
    }
    for s in &sheets {
        let size = match (s.rows, s.columns) {
            (Some(r), Some(c)) => format!("{r}x{c}"),
            _ => "-".to_string(),
        };
        if ctx.use_color {
            println!("{:>4}  {:<24} {}", s.index, s.title.cyan(), size.dimmed());
        } else {
            println!("{:>4}  {:<24} {}", s.index, s.title, size);
        }
    }
    Ok(())
}
