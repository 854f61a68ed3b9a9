use crate::config::GatewayConfig;
use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use url::Url;

/// Closed set of backend services the gateway can route to. Adding a backend
/// means adding a variant here plus its entry in `ALL`; the registry then
/// refuses to start until the matching address variable is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceId {
    News,
    Issuepool,
    Sasb,
    Watchdog,
}

impl ServiceId {
    pub const ALL: [ServiceId; 4] = [
        ServiceId::News,
        ServiceId::Issuepool,
        ServiceId::Sasb,
        ServiceId::Watchdog,
    ];

    /// Path segment used both for inbound routing and outbound URLs.
    pub fn segment(&self) -> &'static str {
        match self {
            ServiceId::News => "news",
            ServiceId::Issuepool => "issuepool",
            ServiceId::Sasb => "sasb",
            ServiceId::Watchdog => "watchdog",
        }
    }

    /// Environment variable carrying this service's base address.
    pub fn env_var(&self) -> &'static str {
        match self {
            ServiceId::News => "NEWS_SERVICE_URL",
            ServiceId::Issuepool => "ISSUEPOOL_SERVICE_URL",
            ServiceId::Sasb => "SASB_SERVICE_URL",
            ServiceId::Watchdog => "WATCHDOG_SERVICE_URL",
        }
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segment())
    }
}

impl FromStr for ServiceId {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "news" => Ok(ServiceId::News),
            "issuepool" => Ok(ServiceId::Issuepool),
            "sasb" => Ok(ServiceId::Sasb),
            "watchdog" => Ok(ServiceId::Watchdog),
            other => Err(GatewayError::UnknownService(other.to_string())),
        }
    }
}

/// Validated base address of one backend. Constructed once at startup and
/// never mutated.
#[derive(Debug, Clone)]
pub struct BackendAddress {
    base: Url,
}

impl BackendAddress {
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(GatewayError::Config("empty backend address".to_string()));
        }
        let base = Url::parse(trimmed)?;
        if !base.has_host() {
            return Err(GatewayError::Config(format!(
                "backend address has no host: {}",
                trimmed
            )));
        }
        Ok(Self { base })
    }

    pub fn as_str(&self) -> &str {
        self.base.as_str()
    }
}

/// Immutable identifier-to-address table, fully built before the first
/// request is served. Construction fails if any declared service lacks a
/// configured address, so a missing variable is a startup error and not a
/// per-request surprise.
#[derive(Debug)]
pub struct ServiceRegistry {
    backends: HashMap<ServiceId, BackendAddress>,
}

impl ServiceRegistry {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut backends = HashMap::new();

        for service in ServiceId::ALL {
            let raw = config.backend_url(service).ok_or_else(|| {
                GatewayError::Config(format!(
                    "no address configured for service '{}' (set {})",
                    service,
                    service.env_var()
                ))
            })?;
            let address = BackendAddress::parse(raw).map_err(|e| {
                GatewayError::Config(format!("invalid address for service '{}': {}", service, e))
            })?;
            backends.insert(service, address);
        }

        Ok(Self { backends })
    }

    /// Infallible for every `ServiceId` once construction succeeded.
    pub fn resolve(&self, service: ServiceId) -> &BackendAddress {
        &self.backends[&service]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        for service in ServiceId::ALL {
            config
                .backends
                .insert(service, format!("http://{}:8001", service.segment()));
        }
        config
    }

    #[test]
    fn test_resolve_all_known_services() {
        let registry = ServiceRegistry::from_config(&full_config()).unwrap();
        for service in ServiceId::ALL {
            let address = registry.resolve(service);
            assert!(!address.as_str().is_empty());
            assert!(address.as_str().contains(service.segment()));
        }
    }

    #[test]
    fn test_missing_backend_fails_at_startup() {
        let mut config = full_config();
        config.backends.remove(&ServiceId::Sasb);

        let err = ServiceRegistry::from_config(&config).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("sasb"));
        assert!(msg.contains("SASB_SERVICE_URL"));
    }

    #[test]
    fn test_invalid_backend_address_fails_at_startup() {
        let mut config = full_config();
        config
            .backends
            .insert(ServiceId::News, "not a url".to_string());
        assert!(ServiceRegistry::from_config(&config).is_err());
    }

    #[test]
    fn test_empty_backend_address_rejected() {
        let mut config = full_config();
        config.backends.insert(ServiceId::News, "  ".to_string());
        assert!(ServiceRegistry::from_config(&config).is_err());
    }

    #[test]
    fn test_segment_round_trip() {
        for service in ServiceId::ALL {
            assert_eq!(service.segment().parse::<ServiceId>().unwrap(), service);
        }
        assert!(matches!(
            "unknown".parse::<ServiceId>(),
            Err(GatewayError::UnknownService(_))
        ));
    }
}
