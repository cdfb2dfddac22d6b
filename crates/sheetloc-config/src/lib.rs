use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "sheetloc.toml";
pub const DEFAULT_SOURCE_LOCALE: &str = "en";
pub const DEFAULT_LANG_DIR: &str = "lang";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// On-disk shape of `sheetloc.toml`. Every field is optional so files can be layered.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SheetLocConfig {
    pub spreadsheet_id: Option<String>,
    pub source_locale: Option<String>,
    pub lang_dir: Option<String>,
    pub credentials: Option<CredentialsCfg>,
    pub polling: Option<PollingCfg>,
    pub http: Option<HttpCfg>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsCfg {
    pub access_token: Option<String>,
    pub token_file: Option<String>,
    pub token_command: Option<String>,
    /// Google service-account key file (JSON); tokens are minted and refreshed from it.
    pub service_account_path: Option<String>,
}

impl CredentialsCfg {
    fn is_set(&self) -> bool {
        self.access_token.is_some()
            || self.token_file.is_some()
            || self.token_command.is_some()
            || self.service_account_path.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollingCfg {
    pub interval_secs: Option<u64>,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpCfg {
    pub timeout_secs: Option<u64>,
    pub base_url: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("spreadsheet id is not configured (set `spreadsheet_id` in sheetloc.toml or SHEETLOC_SPREADSHEET_ID)")]
    MissingSpreadsheetId,
    #[error("no credentials configured (set [credentials] in sheetloc.toml or SHEETLOC_ACCESS_TOKEN)")]
    MissingCredentials,
}

/// How the bearer token for the spreadsheet API is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    AccessToken(String),
    TokenFile(PathBuf),
    /// Command whose trimmed stdout is the token, e.g. `gcloud auth print-access-token`.
    TokenCommand(String),
    /// Service-account key file; the client signs a JWT and exchanges it for short-lived tokens.
    ServiceAccount(PathBuf),
}

impl Credentials {
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::AccessToken(_) => "access_token",
            Credentials::TokenFile(_) => "token_file",
            Credentials::TokenCommand(_) => "token_command",
            Credentials::ServiceAccount(_) => "service_account",
        }
    }
}

/// Resolved settings handed to the sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub spreadsheet_id: Option<String>,
    pub credentials: Option<Credentials>,
    pub source_locale: String,
    pub lang_dir: PathBuf,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
    pub http_timeout: Duration,
    pub base_url: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig::from(SheetLocConfig::default())
    }
}

impl From<SheetLocConfig> for SyncConfig {
    fn from(cfg: SheetLocConfig) -> Self {
        let credentials = cfg.credentials.and_then(|c| {
            if let Some(t) = non_empty(c.access_token) {
                Some(Credentials::AccessToken(t))
            } else if let Some(p) = non_empty(c.token_file) {
                Some(Credentials::TokenFile(PathBuf::from(p)))
            } else if let Some(cmd) = non_empty(c.token_command) {
                Some(Credentials::TokenCommand(cmd))
            } else {
                non_empty(c.service_account_path)
                    .map(|p| Credentials::ServiceAccount(PathBuf::from(p)))
            }
        });
        let polling = cfg.polling.unwrap_or_default();
        let http = cfg.http.unwrap_or_default();
        SyncConfig {
            spreadsheet_id: non_empty(cfg.spreadsheet_id),
            credentials,
            source_locale: non_empty(cfg.source_locale)
                .unwrap_or_else(|| DEFAULT_SOURCE_LOCALE.to_string()),
            lang_dir: PathBuf::from(
                non_empty(cfg.lang_dir).unwrap_or_else(|| DEFAULT_LANG_DIR.to_string()),
            ),
            poll_interval: Duration::from_secs(
                polling.interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            ),
            poll_max_attempts: polling
                .max_attempts
                .unwrap_or(DEFAULT_POLL_MAX_ATTEMPTS)
                .max(1),
            http_timeout: Duration::from_secs(
                http.timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            base_url: non_empty(http.base_url).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

impl SyncConfig {
    pub fn require_spreadsheet_id(&self) -> Result<&str, ConfigError> {
        self.spreadsheet_id
            .as_deref()
            .ok_or(ConfigError::MissingSpreadsheetId)
    }

    pub fn require_credentials(&self) -> Result<&Credentials, ConfigError> {
        self.credentials
            .as_ref()
            .ok_or(ConfigError::MissingCredentials)
    }

    pub fn is_configured(&self) -> bool {
        self.spreadsheet_id.is_some()
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Load and merge configuration. Search order: `explicit`, CWD/sheetloc.toml,
/// `<config_dir>/sheetloc/sheetloc.toml`; environment variables win over all files.
pub fn load_config(explicit: Option<&Path>) -> Result<SyncConfig, ConfigError> {
    let mut paths = Vec::new();
    if let Some(p) = explicit {
        paths.push(p.to_path_buf());
    }
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(CONFIG_FILE));
    }
    if let Some(base) = dirs::config_dir() {
        paths.push(base.join("sheetloc").join(CONFIG_FILE));
    }
    let merged = load_layers(&paths, explicit)?;
    let merged = apply_env(merged, |name| std::env::var(name).ok());
    Ok(SyncConfig::from(merged))
}

/// Merge the files that exist among `paths`, earlier paths winning.
/// A missing `required` file is an error; other missing files are skipped.
pub fn load_layers(paths: &[PathBuf], required: Option<&Path>) -> Result<SheetLocConfig, ConfigError> {
    let mut merged = SheetLocConfig::default();
    for path in paths {
        let text = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && Some(path.as_path()) != required => {
                continue;
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.clone(),
                    source,
                })
            }
        };
        let cfg = toml::from_str::<SheetLocConfig>(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(event = "config_layer_loaded", path = %path.display());
        merged = merge(merged, cfg);
    }
    Ok(merged)
}

/// Overlay `SHEETLOC_*` variables on top of file configuration.
pub fn apply_env(mut cfg: SheetLocConfig, var: impl Fn(&str) -> Option<String>) -> SheetLocConfig {
    if let Some(v) = var("SHEETLOC_SPREADSHEET_ID") {
        cfg.spreadsheet_id = Some(v);
    }
    if let Some(v) = var("SHEETLOC_SOURCE_LOCALE") {
        cfg.source_locale = Some(v);
    }
    if let Some(v) = var("SHEETLOC_LANG_DIR") {
        cfg.lang_dir = Some(v);
    }
    let env_creds = CredentialsCfg {
        access_token: var("SHEETLOC_ACCESS_TOKEN"),
        token_file: var("SHEETLOC_TOKEN_FILE"),
        token_command: var("SHEETLOC_TOKEN_COMMAND"),
        service_account_path: var("SHEETLOC_SERVICE_ACCOUNT_PATH"),
    };
    if env_creds.is_set() {
        // A credential from the environment replaces file credentials entirely,
        // otherwise a file `access_token` would shadow an env `token_command`.
        cfg.credentials = Some(env_creds);
    }
    cfg
}

fn merge(mut a: SheetLocConfig, b: SheetLocConfig) -> SheetLocConfig {
    if a.spreadsheet_id.is_none() {
        a.spreadsheet_id = b.spreadsheet_id;
    }
    if a.source_locale.is_none() {
        a.source_locale = b.source_locale;
    }
    if a.lang_dir.is_none() {
        a.lang_dir = b.lang_dir;
    }
    a.credentials = merge_opt(a.credentials, b.credentials, merge_credentials);
    a.polling = merge_opt(a.polling, b.polling, merge_polling);
    a.http = merge_opt(a.http, b.http, merge_http);
    a
}

fn merge_opt<T>(a: Option<T>, b: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (None, Some(b)) => Some(b),
        (Some(a), None) => Some(a),
        (None, None) => None,
    }
}

fn merge_credentials(a: CredentialsCfg, b: CredentialsCfg) -> CredentialsCfg {
    // Credentials are taken as a unit from the first layer that has any.
    if a.is_set() {
        a
    } else {
        b
    }
}

fn merge_polling(mut a: PollingCfg, b: PollingCfg) -> PollingCfg {
    if a.interval_secs.is_none() {
        a.interval_secs = b.interval_secs;
    }
    if a.max_attempts.is_none() {
        a.max_attempts = b.max_attempts;
    }
    a
}

fn merge_http(mut a: HttpCfg, b: HttpCfg) -> HttpCfg {
    if a.timeout_secs.is_none() {
        a.timeout_secs = b.timeout_secs;
    }
    if a.base_url.is_none() {
        a.base_url = b.base_url;
    }
    a
}
