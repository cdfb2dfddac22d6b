mod commands;
mod ui;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use commands::{Context, OutputFormat};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(
    name = "sheetloc",
    version,
    about = "Translate JSON language files through a shared Google Sheet"
)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Only print warnings and errors on the console
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file, read before ./sheetloc.toml and the user config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the rolling debug log
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate every source file into one target locale
    Translate {
        /// Target locale, e.g. `es`
        target: String,
        /// Source locale (defaults to the configured one)
        #[arg(long)]
        source: Option<String>,
        /// Version tag of the rows written to the sheet
        #[arg(long)]
        tag: Option<String>,
        /// Sheet title (defaults to today's date)
        #[arg(long)]
        sheet: Option<String>,
        /// Directory holding the language files
        #[arg(long)]
        lang_dir: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Translate into several locales on one shared sheet
    Sync {
        /// Comma-separated target locales, e.g. `es,fr`
        #[arg(long)]
        locales: String,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        sheet: Option<String>,
        #[arg(long)]
        lang_dir: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List the sheets of the configured spreadsheet, newest first
    Sheets {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the effective configuration without contacting the spreadsheet
    Status {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Write JSON schemas of the report formats
    Schema {
        #[arg(long, default_value = "./docs/schemas")]
        out_dir: PathBuf,
    },
}

trait Runnable {
    fn run(self, ctx: &Context) -> Result<()>;
}

impl Runnable for Commands {
    fn run(self, ctx: &Context) -> Result<()> {
        let cmd_name = format!("{self:?}");
        info!(event = "command_start", command = %cmd_name);

        let result = match self {
            Commands::Translate {
                target,
                source,
                tag,
                sheet,
                lang_dir,
                format,
            } => {
                debug!(event = "translate_args", target = %target, source = ?source, tag = ?tag, sheet = ?sheet, lang_dir = ?lang_dir);
                commands::translate::run_translate(
                    ctx,
                    commands::translate::TranslateArgs {
                        target,
                        source,
                        tag,
                        sheet,
                        lang_dir,
                    },
                    format,
                )
            }
            Commands::Sync {
                locales,
                source,
                tag,
                sheet,
                lang_dir,
                format,
            } => {
                debug!(event = "sync_args", locales = %locales, source = ?source, tag = ?tag, sheet = ?sheet, lang_dir = ?lang_dir);
                commands::sync::run_sync(
                    ctx,
                    commands::sync::SyncArgs {
                        locales,
                        source,
                        tag,
                        sheet,
                        lang_dir,
                    },
                    format,
                )
            }
            Commands::Sheets { format } => commands::sheets::run_sheets(ctx, format),
            Commands::Status { format } => commands::status::run_status(ctx, format),
            Commands::Schema { out_dir } => commands::schema::run_schema(out_dir),
        };

        match &result {
            Ok(()) => info!(event = "command_finished", command = %cmd_name),
            Err(e) => error!(event = "command_failed", command = %cmd_name, error = ?e),
        }
        result
    }
}

fn init_tracing(log_dir: &std::path::Path, quiet: bool) -> WorkerGuard {
    let file_appender = rolling::daily(log_dir, "sheetloc.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if quiet { "warn" } else { "info" };
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        );

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
    guard
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let _guard = init_tracing(&cli.log_dir, cli.quiet);

    let use_color = !cli.no_color
        && std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none();

    let ctx = Context {
        config_path: cli.config,
        use_color,
    };
    cli.cmd.run(&ctx)
}
