pub mod schema;
pub mod sheets;
pub mod status;
pub mod sync;
pub mod translate;

use color_eyre::eyre::{Result, WrapErr};
use sheetloc_config::SyncConfig;
use sheetloc_sheets::HttpSheetsClient;
use std::path::PathBuf;

/// Settings shared by every command.
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub use_color: bool,
}

impl Context {
    pub fn load_config(&self) -> Result<SyncConfig> {
        sheetloc_config::load_config(self.config_path.as_deref())
            .wrap_err("loading configuration")
    }

    /// Remote client for the configured spreadsheet. Fails before any request
    /// when the spreadsheet id or credentials are missing.
    pub fn connect(&self, cfg: &SyncConfig) -> Result<HttpSheetsClient> {
        HttpSheetsClient::from_config(cfg)
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    println!();
    Ok(())
}
