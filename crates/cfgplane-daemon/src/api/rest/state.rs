//! Application state for API handlers

use crate::services::{ConfigGroupService, ConfigService, StandaloneConfigService};
use cfgplane_placement::ReplyHandler;
use cfgplane_types::{ConfigGroup, StandaloneConfig};
use std::sync::Arc;

/// Shared state of the config API
#[derive(Clone)]
pub struct AppState {
    /// Standalone config service
    pub standalone: Arc<StandaloneConfigService>,

    /// Config group service
    pub groups: Arc<ConfigGroupService>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(standalone: Arc<StandaloneConfigService>, groups: Arc<ConfigGroupService>) -> Self {
        Self {
            standalone,
            groups,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let secs = (chrono::Utc::now() - self.started_at).num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        }
    }
}

/// Selects the service for an artifact kind so handlers can be generic
pub trait ServiceFor<C> {
    fn service(&self) -> &ConfigService<C>;
}

impl ServiceFor<StandaloneConfig> for AppState {
    fn service(&self) -> &ConfigService<StandaloneConfig> {
        &self.standalone
    }
}

impl ServiceFor<ConfigGroup> for AppState {
    fn service(&self) -> &ConfigService<ConfigGroup> {
        &self.groups
    }
}

/// Shared state of the reply webhooks
#[derive(Clone)]
pub struct WebhookState {
    pub replies: ReplyHandler,
}

impl WebhookState {
    pub fn new(replies: ReplyHandler) -> Self {
        Self { replies }
    }
}
