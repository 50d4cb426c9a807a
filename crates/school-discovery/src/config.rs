use std::path::{Path, PathBuf};
use std::time::Duration;

use discovery_common::supabase::SupabaseConfig;

use crate::error::AppError;

const DEFAULT_SEED_CSV: &str = "data/schools.csv";
const DEFAULT_CACHE_TTL_SECS: u64 = 900;
const DEFAULT_SUPABASE_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_ERROR_BODY_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone)]
pub struct SupabaseSettings {
    pub connection: SupabaseConfig,
    pub schools_table: String,
    pub cities_table: String,
    pub states_table: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub supabase: Option<SupabaseSettings>,
    pub seed_csv_path: String,
    pub redis_url: Option<String>,
    pub cache_ttl_secs: u64,
    pub http_addr: Option<String>,
    pub mcp_tcp_addr: Option<String>,
}

impl Config {
    /// Optional:
    /// - `SUPABASE_URL`, with `SUPABASE_ANON_KEY` (required once the URL is set)
    /// - `SUPABASE_SCHOOLS_TABLE` (default: "schools")
    /// - `SUPABASE_CITIES_TABLE` (default: "cities")
    /// - `SUPABASE_STATES_TABLE` (default: "states")
    /// - `SUPABASE_TIMEOUT_SECS` (default: 15)
    /// - `SUPABASE_MAX_ERROR_BODY_BYTES` (default: 8192)
    /// - `SCHOOLS_SEED_CSV` (default: "data/schools.csv"; must exist without Supabase)
    /// - `REDIS_URL`
    /// - `CATALOG_CACHE_TTL_SECS` (default: 900; must be positive)
    /// - `DISCOVERY_HTTP_ADDR` (REST listener)
    /// - `MCP_TCP_LISTEN_ADDR` (MCP over TCP instead of stdio)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        // Blank values count as unset.
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let supabase = match var("SUPABASE_URL") {
            Some(url) => {
                let anon_key = var("SUPABASE_ANON_KEY").ok_or_else(|| {
                    AppError::Config(
                        "SUPABASE_ANON_KEY environment variable is required when SUPABASE_URL is set"
                            .to_string(),
                    )
                })?;
                let timeout_secs =
                    parse_number(&var, "SUPABASE_TIMEOUT_SECS", DEFAULT_SUPABASE_TIMEOUT_SECS)?;
                let max_error_body_bytes = parse_number(
                    &var,
                    "SUPABASE_MAX_ERROR_BODY_BYTES",
                    DEFAULT_MAX_ERROR_BODY_BYTES,
                )?;
                Some(SupabaseSettings {
                    connection: SupabaseConfig::new(url, anon_key)
                        .with_timeout(Duration::from_secs(timeout_secs))
                        .with_max_error_body_bytes(max_error_body_bytes),
                    schools_table: var("SUPABASE_SCHOOLS_TABLE").unwrap_or_else(|| "schools".to_string()),
                    cities_table: var("SUPABASE_CITIES_TABLE").unwrap_or_else(|| "cities".to_string()),
                    states_table: var("SUPABASE_STATES_TABLE").unwrap_or_else(|| "states".to_string()),
                })
            }
            None => None,
        };

        let seed_csv_path = var("SCHOOLS_SEED_CSV").unwrap_or_else(|| DEFAULT_SEED_CSV.to_string());
        if supabase.is_none() && !Path::new(&seed_csv_path).exists() {
            return Err(AppError::Config(format!(
                "SUPABASE_URL is not set and the seed file does not exist: {seed_csv_path}"
            )));
        }

        // Redis rejects a zero expiry.
        let cache_ttl_secs = parse_number(&var, "CATALOG_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;
        if cache_ttl_secs == 0 {
            return Err(AppError::Config(
                "CATALOG_CACHE_TTL_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            supabase,
            seed_csv_path,
            redis_url: var("REDIS_URL"),
            cache_ttl_secs,
            http_addr: var("DISCOVERY_HTTP_ADDR"),
            mcp_tcp_addr: var("MCP_TCP_LISTEN_ADDR"),
        })
    }

    pub fn seed_csv_path(&self) -> PathBuf {
        Path::new(&self.seed_csv_path).to_path_buf()
    }
}

fn parse_number<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError> {
    match var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::Config(format!("{name} must be a non-negative integer, got '{raw}'"))),
        None => Ok(default),
    }
}
