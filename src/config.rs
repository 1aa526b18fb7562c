use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 7171;
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_PAGE_SIZE: i64 = 20;
/// Largest page size accepted from the environment.
pub const MAX_PAGE_SIZE: i64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Base URL of the remote transactions service, without a trailing slash.
    pub api_base_url: String,
    pub page_size: i64,
    pub request_timeout: Duration,
    pub database_path: PathBuf,
    pub migrations_path: PathBuf,
    pub static_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            api_base_url: DEFAULT_API_URL.into(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            database_path: PathBuf::from("data/spendscope.db"),
            migrations_path: PathBuf::from("migrations"),
            static_path: PathBuf::from("static"),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. Unset or unparsable
    /// values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            host: lookup("SPENDSCOPE_HOST").unwrap_or(defaults.host),
            port: lookup("SPENDSCOPE_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            api_base_url: lookup("SPENDSCOPE_API_URL")
                .map(|v| normalize_base_url(&v))
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.api_base_url),
            page_size: lookup("SPENDSCOPE_PAGE_SIZE")
                .and_then(|p| p.parse::<i64>().ok())
                .filter(|p| *p > 0)
                .map(|p| p.min(MAX_PAGE_SIZE))
                .unwrap_or(defaults.page_size),
            request_timeout: lookup("SPENDSCOPE_REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            database_path: lookup("SPENDSCOPE_DATABASE_URL")
                .map(|v| {
                    PathBuf::from(
                        v.strip_prefix("sqlite://")
                            .or_else(|| v.strip_prefix("sqlite:"))
                            .unwrap_or(&v),
                    )
                })
                .unwrap_or(defaults.database_path),
            migrations_path: lookup("SPENDSCOPE_MIGRATIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.migrations_path),
            static_path: lookup("SPENDSCOPE_STATIC_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_path),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
