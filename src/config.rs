use crate::lifecycle::{ConfigError, LifecycleConfig};

/// Where orders and carts are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Scylla,
}

/// Process configuration for the service binary.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub scylla_node: String,
    pub scylla_keyspace: String,
    pub metrics_port: u16,
    pub lifecycle: LifecycleConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_backend: StoreBackend::Memory,
            scylla_node: "127.0.0.1:9042".to_string(),
            scylla_keyspace: "food_orders".to_string(),
            metrics_port: 9090,
            lifecycle: LifecycleConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let store_backend = match lookup("ORDER_STORE").as_deref().map(str::trim) {
            None | Some("memory") => StoreBackend::Memory,
            Some("scylla") => StoreBackend::Scylla,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "ORDER_STORE".to_string(),
                    value: other.to_string(),
                })
            }
        };

        let metrics_port = match lookup("METRICS_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "METRICS_PORT".to_string(),
                value: raw.clone(),
            })?,
            None => defaults.metrics_port,
        };

        Ok(Self {
            store_backend,
            scylla_node: lookup("SCYLLA_NODE").unwrap_or(defaults.scylla_node),
            scylla_keyspace: lookup("SCYLLA_KEYSPACE").unwrap_or(defaults.scylla_keyspace),
            metrics_port,
            lifecycle: LifecycleConfig::from_lookup(&lookup)?,
        })
    }
}
