//! Process configuration read from the environment.
use std::{net::SocketAddr, str::FromStr, time::Duration};

use lora_core::SchedulerConfig;
use lora_observe::{LoggerConfig, LoggerFormat};
use lora_toolkit::{FetchConfig, ToolkitConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key}='{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub toolkit: ToolkitConfig,
    pub fetch: FetchConfig,
    pub scheduler: SchedulerConfig,
    pub listen_addr: SocketAddr,
    pub logger: LoggerConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and blank values take the default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let toolkit_url = env.url("TOOLKIT_URL", "http://172.25.0.1:7861")?;
        let database_url = env
            .get("DATABASE_URL")
            .ok_or(SettingsError::Missing("DATABASE_URL"))?;

        let toolkit = ToolkitConfig {
            base_url: toolkit_url.clone(),
            request_timeout: env.secs("REQUEST_TIMEOUT_SECS", 30)?,
        };
        let fetch = FetchConfig {
            service_url: env.url("GET_FILES_URL", "http://127.0.0.1:8000")?,
            database_url,
            toolkit_url,
            timeout: env.secs("NOTIFY_TIMEOUT_SECS", 60)?,
        };
        let scheduler = SchedulerConfig {
            interval: env.secs("MONITOR_INTERVAL_SECS", 10)?,
            batch_size: env.positive("MONITOR_BATCH_SIZE", 10)?,
            max_concurrency: env.positive("MONITOR_MAX_CONCURRENCY", 10)?,
        };
        let listen_addr = env.parse("LISTEN_ADDR", SocketAddr::from(([0, 0, 0, 0], 5000)))?;

        let mut logger = LoggerConfig::default();
        logger.format = env.parse("LOG_FORMAT", LoggerFormat::Text)?;
        if let Some(level) = env.get("LOG_LEVEL") {
            logger.level = level;
        }

        Ok(Self {
            toolkit,
            fetch,
            scheduler,
            listen_addr,
            logger,
        })
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, SettingsError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| SettingsError::Invalid {
                key,
                reason: e.to_string(),
                value: raw,
            }),
        }
    }

    fn positive(&self, key: &'static str, default: usize) -> Result<usize, SettingsError> {
        let n = self.parse(key, default)?;
        if n == 0 {
            return Err(SettingsError::Invalid {
                key,
                value: n.to_string(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(n)
    }

    fn secs(&self, key: &'static str, default: u64) -> Result<Duration, SettingsError> {
        Ok(Duration::from_secs(self.positive(key, default as usize)? as u64))
    }

    fn url(&self, key: &'static str, default: &str) -> Result<String, SettingsError> {
        let url = self.get(key).unwrap_or_else(|| default.to_string());
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SettingsError::Invalid {
                key,
                value: url,
                reason: "expected an http(s) URL".into(),
            });
        }
        Ok(url.trim_end_matches('/').to_string())
    }
}
