//! Reply channel handling
//!
//! A reply carries everything needed to locate its task: the embedded
//! command holds the task id and the config snapshot holds the identifying
//! tuple. Every failure here is terminal for the reply; there is no caller
//! waiting, so the error is logged and returned to the transport only for
//! its status code.

use crate::engine::{ConfigRef, PlacementEngine};
use crate::error::ReplyError;
use crate::protocol::ApplyConfigReply;
use cfgplane_types::{ConfigKind, PlacementTask, Versioned};
use std::sync::Arc;
use tracing::warn;

/// Resolves placement tasks from node replies
#[derive(Clone)]
pub struct ReplyHandler {
    engine: Arc<PlacementEngine>,
}

impl ReplyHandler {
    pub fn new(engine: Arc<PlacementEngine>) -> Self {
        Self { engine }
    }

    /// Handle one raw reply delivered to the `kind` endpoint
    pub async fn handle(&self, kind: ConfigKind, body: &[u8]) -> Result<PlacementTask, ReplyError> {
        let result = self.resolve(kind, body).await;
        if let Err(e) = &result {
            warn!(kind = %kind, error = %e, "Dropping reply");
        }
        result
    }

    async fn resolve(&self, kind: ConfigKind, body: &[u8]) -> Result<PlacementTask, ReplyError> {
        let reply: ApplyConfigReply =
            serde_json::from_slice(body).map_err(|e| ReplyError::Decode(e.to_string()))?;

        let config = reply
            .cmd
            .decode_config()
            .map_err(|e| ReplyError::Decode(e.to_string()))?;
        if config.kind() != kind {
            return Err(ReplyError::KindMismatch {
                expected: kind,
                actual: config.kind(),
            });
        }

        let status = reply.task_status()?;
        let config_ref = ConfigRef::new(kind, config.id());

        Ok(self
            .engine
            .update_status(&config_ref, &reply.cmd.task_id, status)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{harness, svc_ref};
    use crate::protocol::ApplyConfigCommand;
    use crate::strategy::PlacementStrategy;
    use cfgplane_types::{Error, TaskId, TaskStatus};

    async fn placed_commands(nodes: usize) -> (crate::engine::tests::Harness, Vec<ApplyConfigCommand>) {
        let h = harness(nodes, &[], &[]).await;
        h.engine
            .place(&svc_ref(), &PlacementStrategy::Gossip { percentage: 100 })
            .await
            .unwrap();
        let commands = h
            .queue
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, bytes, _)| ApplyConfigCommand::decode(bytes).unwrap())
            .collect();
        (h, commands)
    }

    #[tokio::test]
    async fn test_placed_reply_resolves_only_its_task() {
        let (h, commands) = placed_commands(2).await;
        let handler = ReplyHandler::new(h.engine.clone());

        h.clock.advance(45);
        let body = ApplyConfigReply::placed(commands[0].clone()).encode().unwrap();
        let task = handler.handle(ConfigKind::Standalone, &body).await.unwrap();
        assert_eq!(task.id, commands[0].task_id);
        assert_eq!(task.status, TaskStatus::Placed);

        let tasks = h.engine.list_tasks(&svc_ref()).await.unwrap();
        let other = tasks.iter().find(|t| t.id == commands[1].task_id).unwrap();
        assert_eq!(other.status, TaskStatus::Accepted);
    }

    #[tokio::test]
    async fn test_failed_reply() {
        let (h, commands) = placed_commands(1).await;
        let handler = ReplyHandler::new(h.engine.clone());

        let body = ApplyConfigReply::failed(commands[0].clone()).encode().unwrap();
        let task = handler.handle(ConfigKind::Standalone, &body).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_malformed_and_misrouted_replies_dropped() {
        let (h, commands) = placed_commands(1).await;
        let handler = ReplyHandler::new(h.engine.clone());

        let err = handler.handle(ConfigKind::Standalone, b"{}").await.unwrap_err();
        assert!(matches!(err, ReplyError::Decode(_)));

        let body = ApplyConfigReply::placed(commands[0].clone()).encode().unwrap();
        let err = handler.handle(ConfigKind::Group, &body).await.unwrap_err();
        assert!(matches!(err, ReplyError::KindMismatch { .. }));

        let mut json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        json["status"] = serde_json::json!("maybe");
        let err = handler
            .handle(ConfigKind::Standalone, &serde_json::to_vec(&json).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(&err, ReplyError::UnknownStatus(raw) if raw == "maybe"));
        assert!(err.to_string().contains("maybe"));

        let tasks = h.engine.list_tasks(&svc_ref()).await.unwrap();
        assert_eq!(tasks[0].status, TaskStatus::Accepted);
    }

    #[tokio::test]
    async fn test_unknown_task_and_duplicate_reply() {
        let (h, commands) = placed_commands(1).await;
        let handler = ReplyHandler::new(h.engine.clone());

        let mut forged = commands[0].clone();
        forged.task_id = TaskId::new("forged");
        let body = ApplyConfigReply::placed(forged).encode().unwrap();
        let err = handler.handle(ConfigKind::Standalone, &body).await.unwrap_err();
        assert!(matches!(err, ReplyError::Update(Error::NotFound(_))));

        let body = ApplyConfigReply::placed(commands[0].clone()).encode().unwrap();
        handler.handle(ConfigKind::Standalone, &body).await.unwrap();
        let err = handler.handle(ConfigKind::Standalone, &body).await.unwrap_err();
        assert!(matches!(err, ReplyError::Update(Error::AlreadyResolved { .. })));
    }
}
