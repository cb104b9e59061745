//! HTTP surfaces: the config API and the reply webhooks

pub mod rest;

pub use rest::router::{create_router, create_webhook_router};
