//! Dissemination protocol messages
//!
//! The command travels engine → queue → node. The reply travels node →
//! webhook and embeds the original command, so the receiving side can
//! recover the config identity and task id without any lookup.

use crate::error::ReplyError;
use async_trait::async_trait;
use cfgplane_types::{
    Config, ConfigGroup, ConfigKind, NodeId, Result, StandaloneConfig, TaskId, TaskStatus, Versioned,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Instruction for one node to apply one configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyConfigCommand {
    pub task_id: TaskId,
    pub namespace: String,
    /// Serialized [`Config`] snapshot, opaque to the transport
    pub config: String,
    pub artifact_kind: ConfigKind,
    pub strategy: String,
}

impl ApplyConfigCommand {
    pub fn new(task_id: TaskId, config: &Config, snapshot: String, strategy: &str) -> Self {
        Self {
            task_id,
            namespace: config.namespace().to_string(),
            config: snapshot,
            artifact_kind: config.kind(),
            strategy: strategy.to_string(),
        }
    }

    /// Serialize a config into the snapshot form carried by commands
    pub fn snapshot(config: &Config) -> Result<String> {
        Ok(serde_json::to_string(config)?)
    }

    /// Recover the artifact from the snapshot
    pub fn decode_config(&self) -> Result<Config> {
        Ok(serde_json::from_str(&self.config)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Outcome a node reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Placed,
    Failed,
}

impl ReplyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyStatus::Placed => "placed",
            ReplyStatus::Failed => "failed",
        }
    }

    /// Map a wire value. Anything other than `placed` or `failed` is
    /// rejected with the raw value rather than coerced.
    pub fn parse(raw: &str) -> std::result::Result<Self, ReplyError> {
        match raw {
            "placed" => Ok(ReplyStatus::Placed),
            "failed" => Ok(ReplyStatus::Failed),
            other => Err(ReplyError::UnknownStatus(other.to_string())),
        }
    }

    pub fn to_task_status(self) -> TaskStatus {
        match self {
            ReplyStatus::Placed => TaskStatus::Placed,
            ReplyStatus::Failed => TaskStatus::Failed,
        }
    }
}

/// Node's report on a command
///
/// `status` stays a plain string on the wire so an unexpected value reaches
/// the reply handler intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyConfigReply {
    pub cmd: ApplyConfigCommand,
    pub status: String,
}

impl ApplyConfigReply {
    pub fn new(cmd: ApplyConfigCommand, status: ReplyStatus) -> Self {
        Self {
            cmd,
            status: status.as_str().to_string(),
        }
    }

    pub fn placed(cmd: ApplyConfigCommand) -> Self {
        Self::new(cmd, ReplyStatus::Placed)
    }

    pub fn failed(cmd: ApplyConfigCommand) -> Self {
        Self::new(cmd, ReplyStatus::Failed)
    }

    /// Task status this reply resolves to
    pub fn task_status(&self) -> std::result::Result<TaskStatus, ReplyError> {
        Ok(ReplyStatus::parse(&self.status)?.to_task_status())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Node-local application of a received configuration
#[async_trait]
pub trait ConfigApplier: Send + Sync {
    async fn apply_standalone(&self, config: &StandaloneConfig) -> std::result::Result<(), String>;

    async fn apply_group(&self, config: &ConfigGroup) -> std::result::Result<(), String>;
}

/// Receiving end of the command channel, run on each node
pub struct NodeAgent<A> {
    node: NodeId,
    applier: A,
}

impl<A: ConfigApplier> NodeAgent<A> {
    pub fn new(node: NodeId, applier: A) -> Self {
        Self { node, applier }
    }

    /// Apply a raw command and build the reply to send back.
    ///
    /// Fails only if the command itself cannot be decoded; an apply error
    /// becomes a `Failed` reply.
    pub async fn handle_command(&self, bytes: &[u8]) -> Result<ApplyConfigReply> {
        let cmd = ApplyConfigCommand::decode(bytes)?;
        let config = cmd.decode_config()?;

        let outcome = match &config {
            Config::Standalone(c) => self.applier.apply_standalone(c).await,
            Config::Group(c) => self.applier.apply_group(c).await,
        };

        match outcome {
            Ok(()) => {
                info!(node = %self.node, task_id = %cmd.task_id, "Applied config");
                Ok(ApplyConfigReply::placed(cmd))
            }
            Err(e) => {
                warn!(node = %self.node, task_id = %cmd.task_id, error = %e, "Failed to apply config");
                Ok(ApplyConfigReply::failed(cmd))
            }
        }
    }
}
