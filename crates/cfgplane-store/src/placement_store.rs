//! Placement task persistence
//!
//! Tasks live under the artifact they deliver, so listing the tasks of one
//! config version is a single prefix scan. Status mutation goes through a
//! compare-and-put on the record's modification revision: of several
//! concurrent replies for the same task, exactly one resolves it and the
//! rest observe `AlreadyResolved`.

use crate::kv::KvBackend;
use crate::records::{self, PlacementTaskRecord};
use async_trait::async_trait;
use cfgplane_types::{
    Config, ConfigId, ConfigKind, Error, PlacementTask, Result, TaskId, TaskStatus, Versioned,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Persistence contract for placement tasks
#[async_trait]
pub trait PlacementStore: Send + Sync {
    /// Persist a task for the given artifact
    async fn place(&self, config: &Config, task: &PlacementTask) -> Result<()>;

    /// All tasks of one artifact version
    async fn list_by_config(&self, kind: ConfigKind, id: &ConfigId) -> Result<Vec<PlacementTask>>;

    async fn get(&self, kind: ConfigKind, id: &ConfigId, task_id: &TaskId) -> Result<PlacementTask>;

    /// Resolve a task to a terminal status
    async fn update_status(
        &self,
        kind: ConfigKind,
        id: &ConfigId,
        task_id: &TaskId,
        status: TaskStatus,
        resolved_at: i64,
    ) -> Result<PlacementTask>;
}

/// [`PlacementStore`] over any [`KvBackend`]
#[derive(Clone)]
pub struct KvPlacementStore {
    kv: Arc<dyn KvBackend>,
}

impl KvPlacementStore {
    pub fn new(kv: Arc<dyn KvBackend>) -> Self {
        Self { kv }
    }
}

fn task_not_found(kind: ConfigKind, id: &ConfigId, task_id: &TaskId) -> Error {
    Error::NotFound(format!("task {task_id} of {kind} {id}"))
}

#[async_trait]
impl PlacementStore for KvPlacementStore {
    async fn place(&self, config: &Config, task: &PlacementTask) -> Result<()> {
        let id = config.id();
        records::check_segments(&id)?;
        if task.kind != config.kind() || task.config != id {
            return Err(Error::Internal(format!(
                "task {} belongs to {} {}, not {} {}",
                task.id,
                task.kind,
                task.config,
                config.kind(),
                id
            )));
        }

        let key = records::task_key(config.kind(), &id, &task.id);
        let value = PlacementTaskRecord::encode(task)?;
        self.kv.put(&key, value).await?;
        debug!(key = %key, node = %task.node, "Stored placement task");
        Ok(())
    }

    async fn list_by_config(&self, kind: ConfigKind, id: &ConfigId) -> Result<Vec<PlacementTask>> {
        records::check_segments(id)?;
        let prefix = records::task_prefix(kind, id);
        let entries = self.kv.get_prefix(&prefix).await?;

        let mut tasks = Vec::with_capacity(entries.len());
        for entry in entries {
            match PlacementTaskRecord::decode(&entry.value) {
                Ok(task) => tasks.push(task),
                Err(e) => warn!(key = %entry.key, error = %e, "Skipping undecodable task record"),
            }
        }
        Ok(tasks)
    }

    async fn get(&self, kind: ConfigKind, id: &ConfigId, task_id: &TaskId) -> Result<PlacementTask> {
        records::check_segments(id)?;
        let key = records::task_key(kind, id, task_id);
        match self.kv.get(&key).await? {
            Some(entry) => PlacementTaskRecord::decode(&entry.value),
            None => Err(task_not_found(kind, id, task_id)),
        }
    }

    async fn update_status(
        &self,
        kind: ConfigKind,
        id: &ConfigId,
        task_id: &TaskId,
        status: TaskStatus,
        resolved_at: i64,
    ) -> Result<PlacementTask> {
        records::check_segments(id)?;
        let key = records::task_key(kind, id, task_id);
        let entry = self
            .kv
            .get(&key)
            .await?
            .ok_or_else(|| task_not_found(kind, id, task_id))?;

        let mut task = PlacementTaskRecord::decode(&entry.value)?;
        task.resolve(status, resolved_at)?;

        let value = PlacementTaskRecord::encode(&task)?;
        if self.kv.put_if_revision(&key, entry.mod_revision, value).await? {
            return Ok(task);
        }

        // Lost the race: report whatever the winner wrote.
        let current = self.get(kind, id, task_id).await?;
        if current.is_resolved() {
            Err(Error::AlreadyResolved {
                task_id: task_id.to_string(),
                status: current.status.to_string(),
            })
        } else {
            Err(Error::Db(format!("task {task_id} changed during update")))
        }
    }
}
