//! Bearer tokens for the spreadsheet API.
//!
//! Tokens either come ready-made (literal value, file, command) or are minted
//! from a Google service-account key: a signed RS256 JWT is exchanged at the
//! key's `token_uri` for an access token, which is cached and renewed shortly
//! before it expires so long runs keep working past the one-hour lifetime.

use crate::Result;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use sheetloc_config::Credentials;
use sheetloc_core::SyncError;
use std::path::Path;
use std::process::Command;
use std::sync::{Mutex, MutexGuard};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// A cached token is renewed once it has less than this many seconds left.
pub const REFRESH_MARGIN_SECS: i64 = 300;

/// The fields of a service-account key file that token minting needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Configuration(format!(
                "cannot read service account key {}: {e}",
                path.display()
            ))
        })?;
        let key = serde_json::from_str(&text).map_err(|e| {
            SyncError::Configuration(format!(
                "invalid service account key {}: {e}",
                path.display()
            ))
        })?;
        Ok(key)
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

struct CachedToken {
    token: String,
    /// Unix seconds.
    expires_at: i64,
}

pub struct ServiceAccountAuth {
    client_email: String,
    key_id: Option<String>,
    token_uri: String,
    encoding_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            SyncError::Configuration(format!("invalid service account private key: {e}"))
        })?;
        let token_uri = key
            .token_uri
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());
        Ok(Self {
            client_email: key.client_email,
            key_id: key.private_key_id,
            token_uri,
            encoding_key,
            cached: Mutex::new(None),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::new(ServiceAccountKey::from_file(path)?)
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    /// Signed JWT asserting the account at `now` (unix seconds), valid for one hour.
    pub fn assertion(&self, now: i64) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();
        let claims = Claims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let jwt = jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| {
            SyncError::Configuration(format!("signing service account assertion: {e}"))
        })?;
        Ok(jwt)
    }

    /// Cached access token, exchanged anew when missing or about to expire.
    pub fn token(&self, client: &Client) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let mut cached = self.lock();
        if let Some(t) = cached
            .as_ref()
            .filter(|t| t.expires_at - REFRESH_MARGIN_SECS > now)
        {
            return Ok(t.token.clone());
        }
        let fresh = self.exchange(client, now)?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    fn lock(&self) -> MutexGuard<'_, Option<CachedToken>> {
        self.cached.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn exchange(&self, client: &Client, now: i64) -> Result<CachedToken> {
        let assertion = self.assertion(now)?;
        tracing::debug!(event = "token_exchange", account = %self.client_email, uri = %self.token_uri);
        let resp = client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(|e| SyncError::RemoteUnavailable(format!("token exchange: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(SyncError::RemoteUnavailable(format!(
                "token exchange: HTTP {status}: {}",
                body.trim()
            ))
            .into());
        }
        let parsed: TokenResponse = resp.json().map_err(|e| {
            SyncError::RemoteUnavailable(format!("token exchange: invalid response: {e}"))
        })?;
        Ok(CachedToken {
            expires_at: now + parsed.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS),
            token: parsed.access_token,
        })
    }
}

/// Where each request's bearer token comes from.
pub enum TokenSource {
    Static(String),
    ServiceAccount(ServiceAccountAuth),
}

impl TokenSource {
    pub fn from_credentials(creds: &Credentials) -> Result<Self> {
        match creds {
            Credentials::ServiceAccount(path) => {
                Ok(Self::ServiceAccount(ServiceAccountAuth::from_file(path)?))
            }
            other => resolve_token(other).map(Self::Static),
        }
    }

    pub fn bearer(&self, client: &Client) -> Result<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::ServiceAccount(sa) => sa.token(client),
        }
    }
}

/// Turn configured credentials into a single bearer token.
///
/// `token_command` runs through the platform shell, so quoting works as typed.
pub fn resolve_token(creds: &Credentials) -> Result<String> {
    let token = match creds {
        Credentials::AccessToken(t) => t.trim().to_string(),
        Credentials::TokenFile(path) => std::fs::read_to_string(path)
            .map_err(|e| {
                SyncError::Configuration(format!("cannot read token file {}: {e}", path.display()))
            })?
            .trim()
            .to_string(),
        Credentials::TokenCommand(cmd) => {
            if cmd.trim().is_empty() {
                return Err(SyncError::Configuration("token_command is empty".into()).into());
            }
            let out = shell_command(cmd)
                .output()
                .map_err(|e| SyncError::RemoteUnavailable(format!("token command `{cmd}`: {e}")))?;
            if !out.status.success() {
                return Err(SyncError::RemoteUnavailable(format!(
                    "token command `{cmd}` exited with {}: {}",
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                ))
                .into());
            }
            String::from_utf8_lossy(&out.stdout).trim().to_string()
        }
        Credentials::ServiceAccount(path) => {
            let client = Client::builder().build()?;
            ServiceAccountAuth::from_file(path)?.token(&client)?
        }
    };
    if token.is_empty() {
        return Err(SyncError::Configuration(format!(
            "{} resolved to an empty token",
            creds.kind()
        ))
        .into());
    }
    Ok(token)
}

#[cfg(windows)]
fn shell_command(cmd: &str) -> Command {
    let mut c = Command::new("cmd");
    c.arg("/C").arg(cmd);
    c
}

#[cfg(not(windows))]
fn shell_command(cmd: &str) -> Command {
    let mut c = Command::new("sh");
    c.arg("-c").arg(cmd);
    c
}
