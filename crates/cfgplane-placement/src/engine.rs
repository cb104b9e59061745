//! Placement engine
//!
//! Orchestrates one placement: resolve the artifact, select nodes, then for
//! every node independently persist an `Accepted` task and dispatch an
//! [`ApplyConfigCommand`]. Per-node failures are logged and never fail the
//! whole placement. The engine holds no state between calls.

use crate::protocol::ApplyConfigCommand;
use crate::queue::AgentQueue;
use crate::registry::{Node, NodeRegistry};
use crate::strategy::PlacementStrategy;
use cfgplane_store::{ConfigStore, PlacementStore};
use cfgplane_types::{
    Clock, Config, ConfigGroup, ConfigId, ConfigKind, PlacementTask, Result, StandaloneConfig,
    TaskId, TaskStatus, Versioned,
};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Placement engine tuning
#[derive(Debug, Clone)]
pub struct PlacementEngineConfig {
    /// Public base URL of the reply webhooks, without the kind path
    pub webhook_base_url: String,
    /// Bound on a single command-channel call
    pub dispatch_timeout: Duration,
    /// Nodes handled concurrently within one placement
    pub max_concurrent_dispatches: usize,
}

impl Default for PlacementEngineConfig {
    fn default() -> Self {
        Self {
            webhook_base_url: "http://127.0.0.1:8091".to_string(),
            dispatch_timeout: Duration::from_secs(5),
            max_concurrent_dispatches: 16,
        }
    }
}

/// Reference to one stored artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRef {
    pub kind: ConfigKind,
    #[serde(flatten)]
    pub id: ConfigId,
}

impl ConfigRef {
    pub fn new(kind: ConfigKind, id: ConfigId) -> Self {
        Self { kind, id }
    }
}

/// Strategy-driven delivery of stored configs to nodes
pub struct PlacementEngine {
    standalone: Arc<dyn ConfigStore<StandaloneConfig>>,
    groups: Arc<dyn ConfigStore<ConfigGroup>>,
    tasks: Arc<dyn PlacementStore>,
    registry: Arc<dyn NodeRegistry>,
    queue: Arc<dyn AgentQueue>,
    clock: Arc<dyn Clock>,
    config: PlacementEngineConfig,
}

impl PlacementEngine {
    pub fn new(
        standalone: Arc<dyn ConfigStore<StandaloneConfig>>,
        groups: Arc<dyn ConfigStore<ConfigGroup>>,
        tasks: Arc<dyn PlacementStore>,
        registry: Arc<dyn NodeRegistry>,
        queue: Arc<dyn AgentQueue>,
        clock: Arc<dyn Clock>,
        config: PlacementEngineConfig,
    ) -> Self {
        Self {
            standalone,
            groups,
            tasks,
            registry,
            queue,
            clock,
            config,
        }
    }

    /// Callback URL nodes use to report outcomes for `kind`
    pub fn reply_url(&self, kind: ConfigKind) -> String {
        format!(
            "{}{}",
            self.config.webhook_base_url.trim_end_matches('/'),
            kind.webhook_path()
        )
    }

    async fn load(&self, config_ref: &ConfigRef) -> Result<Config> {
        match config_ref.kind {
            ConfigKind::Standalone => Ok(self.standalone.get(&config_ref.id).await?.into()),
            ConfigKind::Group => Ok(self.groups.get(&config_ref.id).await?.into()),
        }
    }

    /// Place a stored config on the nodes selected by `strategy`.
    ///
    /// Returns the tasks that were persisted. A node whose task could not be
    /// stored is absent; a node whose command could not be dispatched keeps
    /// its `Accepted` task.
    #[instrument(skip(self, strategy), fields(kind = %config_ref.kind, config = %config_ref.id, strategy = strategy.name()))]
    pub async fn place(
        &self,
        config_ref: &ConfigRef,
        strategy: &PlacementStrategy,
    ) -> Result<Vec<PlacementTask>> {
        let config = self.load(config_ref).await?;
        let nodes = strategy
            .select_nodes(self.registry.as_ref(), config.org())
            .await?;

        if nodes.is_empty() {
            info!("No nodes selected");
            return Ok(Vec::new());
        }

        let snapshot = ApplyConfigCommand::snapshot(&config)?;
        let reply_url = self.reply_url(config.kind());
        let selected = nodes.len();

        let tasks: Vec<PlacementTask> = stream::iter(nodes)
            .map(|node| self.place_on_node(&config, &snapshot, strategy.name(), &reply_url, node))
            .buffered(self.config.max_concurrent_dispatches.max(1))
            .filter_map(|task| async move { task })
            .collect()
            .await;

        info!(selected, created = tasks.len(), "Placement dispatched");
        Ok(tasks)
    }

    async fn place_on_node(
        &self,
        config: &Config,
        snapshot: &str,
        strategy: &str,
        reply_url: &str,
        node: Node,
    ) -> Option<PlacementTask> {
        let task = PlacementTask::accepted(
            TaskId::generate(),
            node.id,
            config.kind(),
            config.id(),
            self.clock.now_unix(),
        );

        if let Err(e) = self.tasks.place(config, &task).await {
            warn!(node = %task.node, task_id = %task.id, error = %e, "Failed to store placement task");
            return None;
        }

        let command = ApplyConfigCommand::new(task.id.clone(), config, snapshot.to_string(), strategy);
        let bytes = match command.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(node = %task.node, task_id = %task.id, error = %e, "Failed to encode command");
                return Some(task);
            }
        };

        let dispatch = self.queue.dispatch(&task.node, &bytes, reply_url);
        match tokio::time::timeout(self.config.dispatch_timeout, dispatch).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(node = %task.node, task_id = %task.id, error = %e, "Failed to dispatch command");
            }
            Err(_) => {
                warn!(
                    node = %task.node,
                    task_id = %task.id,
                    timeout = ?self.config.dispatch_timeout,
                    "Dispatch timed out"
                );
            }
        }

        Some(task)
    }

    /// Every task created for one artifact version
    pub async fn list_tasks(&self, config_ref: &ConfigRef) -> Result<Vec<PlacementTask>> {
        self.tasks
            .list_by_config(config_ref.kind, &config_ref.id)
            .await
    }

    /// Resolve a task; called from the reply path only
    #[instrument(skip(self), fields(kind = %config_ref.kind, config = %config_ref.id, task_id = %task_id))]
    pub async fn update_status(
        &self,
        config_ref: &ConfigRef,
        task_id: &TaskId,
        status: TaskStatus,
    ) -> Result<PlacementTask> {
        let task = self
            .tasks
            .update_status(
                config_ref.kind,
                &config_ref.id,
                task_id,
                status,
                self.clock.now_unix(),
            )
            .await?;
        info!(node = %task.node, status = %task.status, "Task resolved");
        Ok(task)
    }
}
