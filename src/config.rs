use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use crate::error::{ListenerError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Top-level settings, read from `config.json`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub osc: OscConfig,
    pub mqtt: MqttConfig,
    pub log: LogConfig,
    /// Print the raw EEG burst alongside every band snapshot.
    pub print_raw: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OscConfig {
    pub listening_host: String,
    pub listening_port: u16,
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            listening_host: "127.0.0.1".to_string(),
            listening_port: 5000,
        }
    }
}

impl OscConfig {
    /// Resolve host and port into a bindable address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        parse_endpoint(&self.listening_host, self.listening_port)
    }
}

/// Validate an IP/port pair supplied by the operator.
pub fn parse_endpoint(host: &str, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = host.trim().parse().map_err(|_| {
        ListenerError::Configuration(format!("'{}' is not a valid IP address", host))
    })?;
    if port == 0 {
        return Err(ListenerError::Configuration(
            "listening port must be non-zero".to_string(),
        ));
    }
    Ok(SocketAddr::new(ip, port))
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MqttConfig {
    pub enabled: bool,
    pub broker_host: String,
    pub broker_port: u16,
    pub username: String,
    pub password: String,
    pub base_topic: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            username: String::new(),
            password: String::new(),
            base_topic: "headband".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Log file, truncated on every start. `None` logs to stderr.
    pub file: Option<String>,
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: Some("headband.log".to_string()),
            level: "info".to_string(),
        }
    }
}

/// Where a loaded configuration came from. Logging is not up yet while the
/// file is read, so the caller reports this afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    /// No file existed; the defaults were written to it.
    CreatedDefault,
    /// No file existed and the defaults could not be written.
    UnsavedDefault,
}

/// Load the configuration from `path`, writing the defaults there if the
/// file does not exist yet. A file that exists but does not parse is an error.
pub fn load_config(path: impl AsRef<Path>) -> Result<(Config, ConfigSource)> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents)
            .map(|config| (config, ConfigSource::File))
            .map_err(|e| ListenerError::Configuration(format!("{}: {}", path.display(), e))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let config = Config::default();
            // A read-only directory is not fatal
            let written = serde_json::to_string_pretty(&config)
                .ok()
                .map_or(false, |json| std::fs::write(path, json).is_ok());
            let source = if written {
                ConfigSource::CreatedDefault
            } else {
                ConfigSource::UnsavedDefault
            };
            Ok((config, source))
        }
        Err(e) => Err(e.into()),
    }
}
