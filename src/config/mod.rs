use std::time::Duration;

use serde::Deserialize;
use tokio::sync::OnceCell;

static CONFIG: OnceCell<Config> = OnceCell::const_new();

mod config_dir;
pub use config_dir::{CONFIG_ENV, find_config_file, read_config};

mod error;
pub use error::{ConfigError, ConfigResult};

#[derive(Debug, Deserialize)]
pub struct Config {
    host: Host,
    app: App,
    #[serde(default)]
    cache: Cache,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    bindto: String,
}

#[derive(Debug, Deserialize)]
pub struct App {
    jwt: String,
    database_uri: String,
    #[serde(default)]
    docs: bool,
}

/// Upper bound for `cache.retention_secs`, one year.
pub const MAX_RETENTION_SECS: u64 = 365 * 24 * 60 * 60;

/// Key-value store settings. Without `url` progress is kept in process memory.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
    url: Option<String>,
    prefix: String,
    retention_secs: u64,
    timeout_ms: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            url: None,
            prefix: crate::progress::DEFAULT_PREFIX.to_string(),
            retention_secs: crate::progress::DEFAULT_RETENTION.as_secs(),
            timeout_ms: crate::cache::DEFAULT_TIMEOUT.as_millis() as u64,
        }
    }
}

impl Config {
    #[tracing::instrument]
    pub async fn get_or_init(use_local: bool) -> &'static Config {
        CONFIG
            .get_or_init(|| async {
                let config = match read_config(use_local).and_then(|b| Self::from_slice(&b)) {
                    Ok(c) => c,
                    Err(e) => {
                        if !matches!(e, ConfigError::ConfigNotFound) {
                            crate::error::log_error(&e);
                        }
                        tracing::error!("Config not found.");
                        std::process::exit(1);
                    }
                };

                config
            })
            .await
    }

    pub fn from_slice(bytes: &[u8]) -> ConfigResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ConfigError::Invalid(format!("config is not utf-8: {e}")))?;
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.app.jwt.is_empty() {
            return Err(ConfigError::Invalid("app.jwt must not be empty".into()));
        }
        if self.cache.prefix.is_empty() || self.cache.prefix.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "cache.prefix {:?} is not a usable key prefix",
                self.cache.prefix
            )));
        }
        if self.cache.retention_secs == 0 || self.cache.retention_secs > MAX_RETENTION_SECS {
            return Err(ConfigError::Invalid(format!(
                "cache.retention_secs must be between 1 and {MAX_RETENTION_SECS}"
            )));
        }
        if self.cache.timeout_ms == 0 {
            return Err(ConfigError::Invalid("cache.timeout_ms must be positive".into()));
        }
        Ok(())
    }

    #[inline]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[inline]
    pub fn app(&self) -> &App {
        &self.app
    }

    #[inline]
    pub fn cache(&self) -> &Cache {
        &self.cache
    }
}

impl Host {
    #[inline]
    pub fn bindto(&self) -> &str {
        &self.bindto
    }
}

impl App {
    #[inline]
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    #[inline]
    pub fn database_uri(&self) -> &str {
        &self.database_uri
    }

    #[inline]
    pub fn docs(&self) -> bool {
        self.docs
    }
}

impl Cache {
    #[inline]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[inline]
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
