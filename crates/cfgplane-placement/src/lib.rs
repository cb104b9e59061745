//! cfgplane Placement - Delivering configuration to the fleet
//!
//! This crate provides:
//!
//! - **NodeRegistry**: the fleet inventory the engine selects from
//! - **PlacementStrategy**: label-query and percentage-gossip node selection
//! - **Dissemination protocol**: [`ApplyConfigCommand`] out to a node through
//!   an [`AgentQueue`], [`ApplyConfigReply`] back through an HTTP webhook
//! - **PlacementEngine**: config lookup, node selection, per-node task
//!   creation and dispatch
//! - **ReplyHandler**: resolves tasks from incoming replies
//!
//! ## Two channels
//!
//! ```text
//! Place ──> PlacementStore (Accepted) ──> AgentQueue ──> node
//!                                                         │
//! ReplyHandler <── POST /standalone | /groups <───────────┘
//!      │
//!      └──> PlacementStore (Placed | Failed)
//! ```
//!
//! `Place` returns as soon as every command has been handed to the queue.
//! Outcomes arrive later and are only visible by listing tasks.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod engine;
pub mod error;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod reply;
pub mod strategy;

// Re-exports
pub use engine::{ConfigRef, PlacementEngine, PlacementEngineConfig};
pub use error::{DispatchError, RegistryError, ReplyError};
pub use protocol::{ApplyConfigCommand, ApplyConfigReply, ConfigApplier, NodeAgent, ReplyStatus};
pub use queue::{AgentQueue, HttpAgentQueue, LoggingAgentQueue};
pub use registry::{InMemoryNodeRegistry, Node, NodeRegistry, Operator, Selector};
pub use reply::ReplyHandler;
pub use strategy::{PlacementStrategy, StrategyRequest};
