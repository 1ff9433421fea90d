//! Server configuration.
//!
//! Values come from an optional YAML file named by `RAWHTTP_CONFIG`, falling
//! back to defaults for anything unset. `LISTEN` overrides the plain listen
//! address. Durations are written in milliseconds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub const CONFIG_ENV: &str = "RAWHTTP_CONFIG";
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address of the plain-text listener.
    pub listen_addr: String,
    /// HTTPS listener, enabled when present.
    pub tls: Option<TlsConfig>,
    /// Directory served before the route table; disabled when unset.
    pub static_dir: Option<PathBuf>,

    #[serde(rename = "read_timeout_ms", deserialize_with = "millis")]
    pub read_timeout: Duration,
    #[serde(rename = "write_timeout_ms", deserialize_with = "millis")]
    pub write_timeout: Duration,
    /// How long a keep-alive connection may sit between requests.
    #[serde(rename = "idle_timeout_ms", deserialize_with = "millis")]
    pub idle_timeout: Duration,
    #[serde(rename = "shutdown_grace_ms", deserialize_with = "millis")]
    pub shutdown_grace: Duration,

    pub max_header_bytes: usize,
    pub max_body_bytes: usize,
    pub keep_alive: bool,
    /// Emit one access log line per request.
    pub logging: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    #[serde(default = "default_tls_listen_addr")]
    pub listen_addr: String,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

fn default_tls_listen_addr() -> String {
    "0.0.0.0:8443".to_string()
}

fn millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            tls: None,
            static_dir: None,
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(120),
            shutdown_grace: Duration::from_secs(5),
            max_header_bytes: 8192,
            max_body_bytes: 10 * 1024 * 1024,
            keep_alive: true,
            logging: false,
        }
    }
}

impl Config {
    /// Loads configuration from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let listen = std::env::var(LISTEN_ENV).ok();
        Self::load_from(file.as_deref(), listen)
    }

    /// Reads `file` if given, then applies a listen address override.
    pub fn load_from(
        file: Option<&Path>,
        listen_addr: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut cfg = match file {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_yaml_str(&text)?
            }
            None => Self::default(),
        };

        if let Some(addr) = listen_addr {
            cfg.listen_addr = addr;
        }

        Ok(cfg)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }
}
