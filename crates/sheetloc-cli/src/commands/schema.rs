use std::fs;
use std::path::PathBuf;

pub fn run_schema(out_dir: PathBuf) -> color_eyre::Result<()> {
    fs::create_dir_all(&out_dir)?;
    macro_rules! dump {
        ($ty:ty, $name:literal) => {{
            let schema = schemars::schema_for!($ty);
            let path = out_dir.join($name);
            let f = fs::File::create(&path)?;
            serde_json::to_writer_pretty(f, &schema)?;
        }};
    }
    dump!(sheetloc_domain::RunSummary, "run_summary.schema.json");
    dump!(sheetloc_domain::JobReport, "job_report.schema.json");
    dump!(sheetloc_domain::SheetSummary, "sheet_summary.schema.json");
    dump!(sheetloc_domain::StatusReport, "status_report.schema.json");
    crate::ui_ok!("Schemas written to {}", out_dir.display());
    Ok(())
}
