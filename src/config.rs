use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Environment variable naming a YAML config file.
pub const CONFIG_PATH_ENV: &str = "KEEPWIRE_CONFIG";
/// Environment variable overriding `server.listen_addr`.
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

/// Settings consumed by the server core.
///
/// Timeouts are in milliseconds in the config file; use the `Duration`
/// accessors in code.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub listen_addr: String,
    /// Deadline for reading one request once its first byte arrived
    pub read_timeout_ms: u64,
    /// Deadline for writing one response
    pub write_timeout_ms: u64,
    /// How long a keep-alive connection may wait for its next request
    pub idle_timeout_ms: u64,
    /// Requests served on one connection before it is closed
    pub max_requests_per_connection: usize,
    /// Live connections admitted at once; extra ones are dropped on accept
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            read_timeout_ms: 10_000,
            write_timeout_ms: 10_000,
            idle_timeout_ms: 60_000,
            max_requests_per_connection: 100,
            max_connections: 1024,
        }
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.listen_addr.trim().is_empty(), "listen_addr must not be empty");
        anyhow::ensure!(self.read_timeout_ms > 0, "read_timeout_ms must be positive");
        anyhow::ensure!(self.write_timeout_ms > 0, "write_timeout_ms must be positive");
        anyhow::ensure!(self.idle_timeout_ms > 0, "idle_timeout_ms must be positive");
        anyhow::ensure!(
            self.max_requests_per_connection > 0,
            "max_requests_per_connection must be positive"
        );
        anyhow::ensure!(self.max_connections > 0, "max_connections must be positive");
        Ok(())
    }
}

impl Config {
    /// Loads the configuration for the binary.
    ///
    /// Reads the YAML file named by `KEEPWIRE_CONFIG` if set, otherwise starts
    /// from defaults, then applies the `LISTEN` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file {path}"))?;
                Self::from_yaml(&raw).with_context(|| format!("invalid config file {path}"))?
            }
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var(LISTEN_ENV) {
            cfg.server.listen_addr = listen_addr;
        }

        cfg.server.validate()?;
        Ok(cfg)
    }

    /// Parses a YAML document. Missing fields take their defaults.
    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(raw).context("failed to parse YAML config")?;
        Ok(cfg)
    }
}
