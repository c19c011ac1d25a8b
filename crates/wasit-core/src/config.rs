//! Configuration for Wasit

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Declared identity backends, in bind/search consultation order
    #[serde(default)]
    pub backends: Vec<BackendDecl>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
            backends: Vec::new(),
        }
    }
}

impl ProxyConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("WASIT_BIND_ADDRESS") {
            config.server.bind_address = addr;
        }
        if let Ok(port) = std::env::var("WASIT_PORT") {
            if let Ok(p) = port.parse() {
                config.server.port = p;
            }
        }
        if let Ok(level) = std::env::var("WASIT_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(enabled) = std::env::var("WASIT_METRICS_ENABLED") {
            config.metrics.enabled = enabled == "true";
        }

        config
    }

    /// Reject configurations the backend wiring cannot honor
    pub fn validate(&self) -> crate::Result<()> {
        let mut seen = HashSet::new();

        for decl in &self.backends {
            if decl.name.is_empty() {
                return Err(crate::Error::InvalidConfig(
                    "Backend name must not be empty".to_string(),
                ));
            }
            if decl.kind.is_empty() {
                return Err(crate::Error::InvalidConfig(format!(
                    "Backend '{}' has no kind",
                    decl.name
                )));
            }
            if !seen.insert(decl.name.as_str()) {
                return Err(crate::Error::DuplicateBackend(decl.name.clone()));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: crate::DEFAULT_BIND_ADDRESS.to_string(),
            port: crate::DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder at startup
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// One declared backend
///
/// `kind` selects the provider that builds the backend; `settings` is
/// passed to that provider verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendDecl {
    pub name: String,
    pub kind: String,

    #[serde(default)]
    pub settings: HashMap<String, String>,
}
