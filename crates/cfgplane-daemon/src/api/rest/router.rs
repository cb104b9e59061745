//! API Router configuration

use super::handlers;
use super::state::{AppState, ServiceFor, WebhookState};
use crate::config::ServerConfig;
use axum::{
    routing::{get, post},
    Router,
};
use cfgplane_store::StoredConfig;
use cfgplane_types::{ConfigGroup, StandaloneConfig};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Routes of one artifact kind, mounted under `/standalone` or `/groups`
fn config_routes<C>() -> Router<AppState>
where
    C: StoredConfig + Serialize + DeserializeOwned,
    AppState: ServiceFor<C>,
{
    Router::new()
        .route("/", post(handlers::create_config::<C>))
        .route("/diff", post(handlers::diff_configs::<C>))
        .route("/:org/:namespace", get(handlers::list_configs::<C>))
        .route(
            "/:org/:namespace/:name/:version",
            get(handlers::get_config::<C>).delete(handlers::delete_config::<C>),
        )
        .route(
            "/:org/:namespace/:name/:version/place",
            post(handlers::place_config::<C>),
        )
        .route(
            "/:org/:namespace/:name/:version/tasks",
            get(handlers::list_tasks::<C>),
        )
}

/// Create the config API router
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(handlers::health_check))
        // Standalone configs
        .nest("/standalone", config_routes::<StandaloneConfig>())
        // Config groups
        .nest("/groups", config_routes::<ConfigGroup>());

    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.with_state(state)
}

/// Create the reply webhook router
pub fn create_webhook_router(state: WebhookState) -> Router {
    Router::new()
        .route("/standalone", post(handlers::standalone_reply))
        .route("/groups", post(handlers::group_reply))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
