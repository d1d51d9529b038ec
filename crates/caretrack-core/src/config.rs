use chrono::FixedOffset;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{CareError, Result};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_CONFIG_FILE: &str = "caretrack.toml";
pub const ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;
pub const ID_TOKEN_TTL_SECS: u64 = 60 * 60;
pub const CORS_MAX_AGE_SECS: u64 = 12 * 60 * 60;

/// Top-level config (caretrack.toml + CARETRACK_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaretrackConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Offset from UTC that defines the server's local calendar day.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            env: default_env(),
            host: default_host(),
            port: DEFAULT_PORT,
            utc_offset_minutes: 0,
        }
    }
}

impl AppConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn utc_offset(&self) -> Result<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                CareError::Config(format!(
                    "app.utc_offset_minutes out of range: {}",
                    self.utc_offset_minutes
                ))
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(default = "default_access_secret")]
    pub access_token_secret: String,
    #[serde(default = "default_id_secret")]
    pub id_token_secret: String,
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: u64,
    #[serde(default = "default_id_ttl")]
    pub id_token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            audience: default_audience(),
            access_token_secret: default_access_secret(),
            id_token_secret: default_id_secret(),
            access_token_ttl_secs: ACCESS_TOKEN_TTL_SECS,
            id_token_ttl_secs: ID_TOKEN_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Used to build the tracing filter when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write every HTTP request to the request_logs table.
    #[serde(default)]
    pub persist_requests: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            persist_requests: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allow_origins")]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_allow_methods")]
    pub allow_methods: Vec<String>,
    #[serde(default = "default_allow_headers")]
    pub allow_headers: Vec<String>,
    #[serde(default = "default_expose_headers")]
    pub expose_headers: Vec<String>,
    #[serde(default)]
    pub allow_credentials: bool,
    #[serde(default = "default_cors_max_age")]
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: default_allow_origins(),
            allow_methods: default_allow_methods(),
            allow_headers: default_allow_headers(),
            expose_headers: default_expose_headers(),
            allow_credentials: false,
            max_age_secs: CORS_MAX_AGE_SECS,
        }
    }
}

fn default_app_name() -> String {
    "caretrack".to_string()
}
fn default_env() -> String {
    "development".to_string()
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_db_path() -> String {
    "caretrack.db".to_string()
}
fn default_issuer() -> String {
    "caretrack".to_string()
}
fn default_audience() -> String {
    "caretrack-api".to_string()
}
fn default_access_secret() -> String {
    "change-me-access".to_string()
}
fn default_id_secret() -> String {
    "change-me-id".to_string()
}
fn default_access_ttl() -> u64 {
    ACCESS_TOKEN_TTL_SECS
}
fn default_id_ttl() -> u64 {
    ID_TOKEN_TTL_SECS
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_allow_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}
fn default_allow_methods() -> Vec<String> {
    ["GET", "POST", "PATCH", "OPTIONS"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_allow_headers() -> Vec<String> {
    ["Origin", "Content-Type", "Accept", "Authorization"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_expose_headers() -> Vec<String> {
    vec!["Content-Length".to_string()]
}
fn default_cors_max_age() -> u64 {
    CORS_MAX_AGE_SECS
}

impl CaretrackConfig {
    /// Load config from a TOML file with CARETRACK_* env var overrides.
    ///
    /// Nested keys use a double underscore:
    /// `CARETRACK_AUTH__ACCESS_TOKEN_SECRET=...` sets `auth.access_token_secret`.
    /// A missing file is not an error; every field has a default.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("CARETRACK_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        Self::figment(&path)
            .extract()
            .map_err(|e| CareError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("CARETRACK_").ignore(&["CONFIG"]).split("__"))
    }
}
