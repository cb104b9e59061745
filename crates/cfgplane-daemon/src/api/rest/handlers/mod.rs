//! API request handlers

mod configs;
mod health;
mod webhooks;

pub use configs::*;
pub use health::*;
pub use webhooks::*;
