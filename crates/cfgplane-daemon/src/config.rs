//! Configuration for cfgplaned

use cfgplane_placement::PlacementEngineConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Placement engine configuration
    #[serde(default)]
    pub placement: PlacementConfig,

    /// Agent queue configuration
    #[serde(default)]
    pub queue: QueueConfig,

    /// Static node inventory
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Administrative worker configuration
    #[serde(default)]
    pub admin: AdminConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// API listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Reply webhook listen address
    #[serde(default = "default_webhook_addr")]
    pub webhook_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            webhook_addr: default_webhook_addr(),
            enable_cors: true,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Placement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Base URL nodes use to reach the reply webhooks
    #[serde(default = "default_webhook_base_url")]
    pub webhook_base_url: String,

    /// Bound on a single dispatch call in milliseconds
    #[serde(default = "default_dispatch_timeout")]
    pub dispatch_timeout_ms: u64,

    /// Nodes handled concurrently within one placement
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_dispatches: usize,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            webhook_base_url: default_webhook_base_url(),
            dispatch_timeout_ms: default_dispatch_timeout(),
            max_concurrent_dispatches: default_max_concurrent(),
        }
    }
}

impl PlacementConfig {
    pub fn engine_config(&self) -> PlacementEngineConfig {
        PlacementEngineConfig {
            webhook_base_url: self.webhook_base_url.clone(),
            dispatch_timeout: Duration::from_millis(self.dispatch_timeout_ms),
            max_concurrent_dispatches: self.max_concurrent_dispatches,
        }
    }
}

/// Agent queue configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QueueConfig {
    /// Log commands instead of sending them (for development)
    #[default]
    Log,

    /// HTTP agent queue
    Http {
        /// Base URL of the queue service
        url: String,

        /// Request timeout in seconds
        #[serde(default = "default_queue_timeout")]
        timeout_secs: u64,
    },
}

/// A node in the static inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: String,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Static node inventory, keyed by org
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub orgs: BTreeMap<String, Vec<NodeConfig>>,
}

/// Administrative worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Pending inheritance registrations before new ones are dropped
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8090))
}

fn default_webhook_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8091))
}

fn default_request_timeout() -> u64 {
    30
}

fn default_webhook_base_url() -> String {
    "http://127.0.0.1:8091".to_string()
}

fn default_dispatch_timeout() -> u64 {
    5_000
}

fn default_max_concurrent() -> usize {
    16
}

fn default_queue_timeout() -> u64 {
    10
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Add environment variables with CFGPLANE_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("CFGPLANE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8090);
        assert_eq!(config.server.webhook_addr.port(), 8091);
        assert!(matches!(config.queue, QueueConfig::Log));
        assert!(config.registry.orgs.is_empty());
    }

    #[test]
    fn test_engine_config() {
        let placement = PlacementConfig {
            dispatch_timeout_ms: 250,
            ..Default::default()
        };
        let engine = placement.engine_config();
        assert_eq!(engine.dispatch_timeout, Duration::from_millis(250));
        assert_eq!(engine.max_concurrent_dispatches, 16);
    }

    #[test]
    fn test_tagged_queue_config() {
        let queue: QueueConfig =
            serde_json::from_str(r#"{"type": "http", "url": "http://queue:8080"}"#).unwrap();
        match queue {
            QueueConfig::Http { url, timeout_secs } => {
                assert_eq!(url, "http://queue:8080");
                assert_eq!(timeout_secs, 10);
            }
            QueueConfig::Log => panic!("expected http queue"),
        }
    }

    #[test]
    fn test_registry_from_yaml() {
        let config: DaemonConfig = serde_yaml::from_str(
            r#"
registry:
  orgs:
    acme:
      - id: node-1
        labels:
          zone: eu
      - id: node-2
"#,
        )
        .unwrap();
        let acme = &config.registry.orgs["acme"];
        assert_eq!(acme.len(), 2);
        assert_eq!(acme[0].labels["zone"], "eu");
        assert!(acme[1].labels.is_empty());
    }
}
