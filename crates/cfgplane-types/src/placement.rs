//! Placement task state machine
//!
//! ```text
//! Accepted --(reply: placed)--> Placed
//! Accepted --(reply: failed)--> Failed
//! ```
//!
//! Terminal states never transition again; a second resolution attempt is
//! rejected with [`Error::AlreadyResolved`].

use crate::config::ConfigKind;
use crate::error::{Error, Result};
use crate::ids::{ConfigId, NodeId, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery status of one node's task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Accepted,
    Placed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Accepted)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Accepted => f.write_str("Accepted"),
            TaskStatus::Placed => f.write_str("Placed"),
            TaskStatus::Failed => f.write_str("Failed"),
        }
    }
}

/// One node's unit of work within a placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementTask {
    pub id: TaskId,
    pub node: NodeId,
    /// Kind of the artifact being delivered
    pub kind: ConfigKind,
    pub config: ConfigId,
    pub status: TaskStatus,
    /// Unix seconds
    pub accepted_at: i64,
    /// Unix seconds; equals `accepted_at` until resolution
    pub resolved_at: i64,
}

impl PlacementTask {
    /// A freshly dispatched task
    pub fn accepted(id: TaskId, node: NodeId, kind: ConfigKind, config: ConfigId, now: i64) -> Self {
        Self {
            id,
            node,
            kind,
            config,
            status: TaskStatus::Accepted,
            accepted_at: now,
            resolved_at: now,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to a terminal status
    pub fn resolve(&mut self, status: TaskStatus, now: i64) -> Result<()> {
        if self.is_resolved() {
            return Err(Error::AlreadyResolved {
                task_id: self.id.to_string(),
                status: self.status.to_string(),
            });
        }
        if !status.is_terminal() {
            return Err(Error::Internal(format!(
                "task {} can only be resolved to a terminal status",
                self.id
            )));
        }
        self.status = status;
        self.resolved_at = now;
        Ok(())
    }
}
