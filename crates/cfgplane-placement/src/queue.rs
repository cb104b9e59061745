//! Queueing collaborator for the command channel

use crate::error::DispatchError;
use async_trait::async_trait;
use cfgplane_types::NodeId;
use std::time::Duration;
use tracing::{debug, info};

/// Header carrying the destination node id
pub const NODE_HEADER: &str = "x-cfgplane-node";

/// Header carrying the reply callback URL
pub const REPLY_TO_HEADER: &str = "x-cfgplane-reply-to";

/// Hands opaque command bytes to a node-addressed queue.
///
/// An `Ok` only means the queue accepted the command; delivery and the
/// node's outcome are reported later through the reply channel.
#[async_trait]
pub trait AgentQueue: Send + Sync {
    async fn dispatch(&self, node: &NodeId, command: &[u8], reply_url: &str) -> Result<(), DispatchError>;
}

/// Agent queue reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpAgentQueue {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAgentQueue {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/disseminate", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl AgentQueue for HttpAgentQueue {
    async fn dispatch(&self, node: &NodeId, command: &[u8], reply_url: &str) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(self.endpoint())
            .header(NODE_HEADER, node.as_str())
            .header(REPLY_TO_HEADER, reply_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(command.to_vec())
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(node = %node, "Command accepted by agent queue");
        Ok(())
    }
}

/// Queue that only logs commands; for local runs without an agent queue
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingAgentQueue;

#[async_trait]
impl AgentQueue for LoggingAgentQueue {
    async fn dispatch(&self, node: &NodeId, command: &[u8], reply_url: &str) -> Result<(), DispatchError> {
        info!(
            node = %node,
            bytes = command.len(),
            reply_url = %reply_url,
            "Dispatching command (log-only queue)"
        );
        Ok(())
    }
}
