/// Minimal Supabase (PostgREST) reader.
///
/// Only the read side is needed by discovery: `GET /rest/v1/{table}?select=...` with the
/// anon key sent both as `apikey` and as a bearer token. Requests are single-shot; a
/// failed request is reported to the caller, who decides what to fall back to.
use std::fmt;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_MAX_ERROR_BODY_BYTES: usize = 8 * 1024;

#[derive(Clone)]
pub struct SupabaseConfig {
    pub base_url: String,
    pub anon_key: String,
    pub timeout: Duration,
    pub max_error_body_bytes: usize,
}

impl SupabaseConfig {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            timeout: DEFAULT_TIMEOUT,
            max_error_body_bytes: DEFAULT_MAX_ERROR_BODY_BYTES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_error_body_bytes(mut self, max: usize) -> Self {
        self.max_error_body_bytes = max;
        self
    }

    /// REST URL selecting `columns` from `table`.
    pub fn table_url(&self, table: &str, columns: &str) -> String {
        format!(
            "{}/rest/v1/{}?select={}",
            self.base_url,
            urlencoding::encode(table),
            urlencoding::encode(columns)
        )
    }
}

// The anon key stays out of logs.
impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("base_url", &self.base_url)
            .field("anon_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("max_error_body_bytes", &self.max_error_body_bytes)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("upstream returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },
}

#[derive(Clone)]
pub struct SupabaseClient {
    config: SupabaseConfig,
    http: reqwest::Client,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> Result<Self, SupabaseError> {
        let http = reqwest::Client::builder()
            .user_agent("school-discovery")
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    /// Fetch every row of `table`, projecting `columns` (PostgREST syntax, `*` for all).
    pub async fn select_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
    ) -> Result<Vec<T>, SupabaseError> {
        let url = self.config.table_url(table, columns);
        let resp = self
            .http
            .get(&url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.config.anon_key)
            .header(ACCEPT, "application/json")
            .timeout(self.config.timeout)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(to_upstream_error(resp, self.config.max_error_body_bytes).await);
        }
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Distinct non-blank string values of one column, in first-seen order.
    pub async fn select_column_values(
        &self,
        table: &str,
        column: &str,
    ) -> Result<Vec<String>, SupabaseError> {
        let rows: Vec<Map<String, Value>> = self.select_rows(table, column).await?;
        Ok(distinct_column_values(&rows, column))
    }
}

pub fn distinct_column_values(rows: &[Map<String, Value>], column: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for row in rows {
        let Some(Value::String(raw)) = row.get(column) else {
            continue;
        };
        let value = raw.trim();
        if value.is_empty() || values.iter().any(|v| v == value) {
            continue;
        }
        values.push(value.to_string());
    }
    values
}

async fn to_upstream_error(resp: reqwest::Response, max_body_bytes: usize) -> SupabaseError {
    let status = resp.status();
    let body = read_limited_text(resp, max_body_bytes).await;
    match serde_json::from_str::<PostgrestError>(&body) {
        Ok(parsed) => SupabaseError::Upstream {
            status,
            message: parsed.describe(),
        },
        Err(_) => SupabaseError::UpstreamBody { status, body },
    }
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read supabase error body");
            "<failed to read error body>".to_string()
        }
    }
}

/// PostgREST error envelope, e.g. `{"code":"42P01","message":"relation does not exist"}`.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: String,
    code: Option<String>,
    hint: Option<String>,
}

impl PostgrestError {
    fn describe(&self) -> String {
        let mut out = self.message.clone();
        if let Some(code) = &self.code {
            out = format!("{out} (code {code})");
        }
        if let Some(hint) = &self.hint {
            out = format!("{out}; hint: {hint}");
        }
        out
    }
}
