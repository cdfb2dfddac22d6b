use crate::auth::TokenSource;
use crate::{Result, SheetProps, SheetsApi, SpreadsheetMeta, ValueRender};
use color_eyre::eyre::eyre;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Url;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use sheetloc_config::SyncConfig;
use sheetloc_core::SyncError;
use std::time::Duration;

/// Google Sheets v4 REST client authenticated with bearer tokens.
pub struct HttpSheetsClient {
    client: Client,
    base_url: Url,
    spreadsheet_id: String,
    auth: TokenSource,
}

impl HttpSheetsClient {
    pub fn new(
        base_url: &str,
        spreadsheet_id: &str,
        auth: TokenSource,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("sheetloc/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(eyre!("invalid spreadsheet API base url: {base_url}"));
        }
        Ok(Self {
            client,
            base_url,
            spreadsheet_id: spreadsheet_id.to_string(),
            auth,
        })
    }

    /// Build a client from resolved configuration. Fails with a configuration
    /// error before any spreadsheet request when the sheet or credentials are
    /// missing. Service-account tokens are fetched lazily on the first request.
    pub fn from_config(cfg: &SyncConfig) -> Result<Self> {
        let id = cfg
            .require_spreadsheet_id()
            .map_err(|e| SyncError::Configuration(e.to_string()))?;
        let creds = cfg
            .require_credentials()
            .map_err(|e| SyncError::Configuration(e.to_string()))?;
        let auth = TokenSource::from_credentials(creds)?;
        Self::new(&cfg.base_url, id, auth, cfg.http_timeout)
    }

    /// `<base>/v4/spreadsheets/<id><id_suffix>/<tail...>`
    fn url(&self, id_suffix: &str, tail: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segs = url
                .path_segments_mut()
                .map_err(|_| eyre!("invalid spreadsheet API base url"))?;
            segs.pop_if_empty()
                .push("v4")
                .push("spreadsheets")
                .push(&format!("{}{id_suffix}", self.spreadsheet_id));
            segs.extend(tail);
        }
        Ok(url)
    }

    fn send<T: DeserializeOwned>(&self, req: RequestBuilder, op: &str) -> Result<T> {
        let token = self.auth.bearer(&self.client)?;
        let resp = req
            .bearer_auth(token)
            .send()
            .map_err(|e| SyncError::RemoteUnavailable(format!("{op}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(SyncError::RemoteUnavailable(format!(
                "{op}: HTTP {status}: {}",
                body.trim()
            ))
            .into());
        }
        let parsed = resp
            .json::<T>()
            .map_err(|e| SyncError::RemoteUnavailable(format!("{op}: invalid response: {e}")))?;
        Ok(parsed)
    }
}

impl SheetsApi for HttpSheetsClient {
    fn spreadsheet(&self) -> Result<SpreadsheetMeta> {
        let mut url = self.url("", &[])?;
        url.query_pairs_mut()
            .append_pair("fields", "properties.title,sheets.properties");
        tracing::debug!(event = "sheets_get_spreadsheet", url = %url);
        let wire: SpreadsheetWire = self.send(self.client.get(url), "get spreadsheet")?;
        Ok(wire.into_meta())
    }

    fn add_sheet(&self, title: &str) -> Result<()> {
        let url = self.url(":batchUpdate", &[])?;
        tracing::debug!(event = "sheets_add_sheet", title = title);
        let body = serde_json::json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        });
        let _: IgnoredAny = self.send(self.client.post(url).json(&body), "add sheet")?;
        Ok(())
    }

    fn get_values(&self, range: &str, render: ValueRender) -> Result<Vec<Vec<String>>> {
        let mut url = self.url("", &["values", range])?;
        url.query_pairs_mut()
            .append_pair("valueRenderOption", render.as_query());
        tracing::debug!(event = "sheets_get_values", range = range, render = render.as_query());
        let wire: ValueRangeWire = self.send(self.client.get(url), "get values")?;
        Ok(wire.into_rows())
    }

    fn clear_values(&self, range: &str) -> Result<()> {
        let url = self.url("", &["values", &format!("{range}:clear")])?;
        tracing::debug!(event = "sheets_clear_values", range = range);
        let _: IgnoredAny = self.send(
            self.client.post(url).json(&serde_json::json!({})),
            "clear values",
        )?;
        Ok(())
    }

    fn update_values(&self, range: &str, rows: &[Vec<String>]) -> Result<()> {
        let mut url = self.url("", &["values", range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        tracing::debug!(event = "sheets_update_values", range = range, rows = rows.len());
        let body = UpdateBody {
            range,
            major_dimension: "ROWS",
            values: rows,
        };
        let _: IgnoredAny = self.send(self.client.put(url).json(&body), "update values")?;
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBody<'a> {
    range: &'a str,
    major_dimension: &'a str,
    values: &'a [Vec<String>],
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetWire {
    #[serde(default)]
    properties: Option<SpreadsheetPropertiesWire>,
    #[serde(default)]
    sheets: Vec<SheetWire>,
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetPropertiesWire {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetWire {
    properties: SheetPropertiesWire,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetPropertiesWire {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    index: i64,
    #[serde(default)]
    grid_properties: Option<GridPropertiesWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridPropertiesWire {
    row_count: Option<u64>,
    column_count: Option<u64>,
}

impl SpreadsheetWire {
    fn into_meta(self) -> SpreadsheetMeta {
        SpreadsheetMeta {
            title: self.properties.map(|p| p.title).unwrap_or_default(),
            sheets: self
                .sheets
                .into_iter()
                .map(|s| {
                    let p = s.properties;
                    let grid = p.grid_properties;
                    SheetProps {
                        sheet_id: p.sheet_id,
                        title: p.title,
                        index: p.index,
                        row_count: grid.as_ref().and_then(|g| g.row_count),
                        column_count: grid.as_ref().and_then(|g| g.column_count),
                    }
                })
                .collect(),
        }
    }
}

/// The API omits `values` entirely for an empty range.
#[derive(Debug, Default, Deserialize)]
struct ValueRangeWire {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl ValueRangeWire {
    fn into_rows(self) -> Vec<Vec<String>> {
        self.values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect()
    }
}

fn cell_to_string(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(b) => (if b { "TRUE" } else { "FALSE" }).to_string(),
        other => other.to_string(),
    }
}
