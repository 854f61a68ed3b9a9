use crate::registry::ServiceId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Text
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<LogLevel>,
    pub format: Option<LogFormat>,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_pool_max_idle_per_host() -> usize {
    10
}

fn default_pool_idle_timeout() -> u64 {
    90
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub listen_addr: SocketAddr,
    /// Per-call timeout for outbound backend requests.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Maximum idle connections kept per backend host.
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,
    /// How long idle backend connections stay in the pool.
    #[serde(default = "default_pool_idle_timeout")]
    pub pool_idle_timeout_secs: u64,
    /// Optional path prefix the whole inbound surface is mounted under
    /// (the original deployment used "/e/v2").
    #[serde(default)]
    pub route_prefix: Option<String>,
    /// Base address per routable service. Every declared service must have
    /// an entry or registry construction fails at startup.
    #[serde(default)]
    pub backends: HashMap<ServiceId, String>,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".parse().unwrap(),
            request_timeout_secs: default_request_timeout(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
            pool_idle_timeout_secs: default_pool_idle_timeout(),
            route_prefix: None,
            backends: HashMap::new(),
            logging: None,
        }
    }
}

impl GatewayConfig {
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: GatewayConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build a configuration from the process environment: one
    /// `*_SERVICE_URL` variable per backend plus an optional `PORT`.
    /// Missing backend variables are left unset here; the registry rejects
    /// them at startup so a configuration bug never becomes a request error.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.listen_addr = SocketAddr::new(config.listen_addr.ip(), port);
            }
        }

        for service in ServiceId::ALL {
            if let Ok(url) = std::env::var(service.env_var()) {
                if !url.trim().is_empty() {
                    config.backends.insert(service, url);
                }
            }
        }

        config
    }

    pub fn backend_url(&self, service: ServiceId) -> Option<&str> {
        self.backends.get(&service).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.pool_max_idle_per_host, 10);
        assert!(config.backends.is_empty());
    }

    #[test]
    fn test_config_json_round_trip() {
        let mut config = GatewayConfig::default();
        config
            .backends
            .insert(ServiceId::News, "http://news:8001".to_string());
        config.route_prefix = Some("/e/v2".to_string());

        let json = serde_json::to_string(&config).unwrap();
        let parsed: GatewayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.backend_url(ServiceId::News), Some("http://news:8001"));
        assert_eq!(parsed.route_prefix.as_deref(), Some("/e/v2"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{"listen_addr": "127.0.0.1:9000", "backends": {"news": "http://n:1"}}"#;
        let config: GatewayConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.backend_url(ServiceId::News), Some("http://n:1"));
        assert_eq!(config.backend_url(ServiceId::Sasb), None);
    }
}
