//! Reply webhooks
//!
//! Nodes post their `ApplyConfigReply` here. The body is handed to the
//! reply handler as raw bytes so malformed replies are logged there with
//! the rest of the reply path.

use crate::api::rest::state::WebhookState;
use crate::error::ApiResult;
use axum::{body::Bytes, extract::State, http::StatusCode};
use cfgplane_types::ConfigKind;

async fn resolve(state: &WebhookState, kind: ConfigKind, body: &[u8]) -> ApiResult<StatusCode> {
    state.replies.handle(kind, body).await?;
    Ok(StatusCode::OK)
}

/// Reply for a standalone config placement
pub async fn standalone_reply(State(state): State<WebhookState>, body: Bytes) -> ApiResult<StatusCode> {
    resolve(&state, ConfigKind::Standalone, &body).await
}

/// Reply for a config group placement
pub async fn group_reply(State(state): State<WebhookState>, body: Bytes) -> ApiResult<StatusCode> {
    resolve(&state, ConfigKind::Group, &body).await
}
