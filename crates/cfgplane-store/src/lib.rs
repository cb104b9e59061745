//! cfgplane Store - Persistence for configuration artifacts and placement tasks
//!
//! This crate provides:
//!
//! - **KvBackend**: the contract a key-value database must satisfy (point
//!   reads, prefix scans, create-if-absent, compare-and-put, delete with the
//!   previous value)
//! - **ConfigStore**: create-only versioned persistence, generic over the
//!   artifact kind
//! - **PlacementStore**: per-node delivery task persistence
//!
//! ## Key layout
//!
//! ```text
//! standalone/<org>/<namespace>/<name>/<version>
//! groups/<org>/<namespace>/<name>/<version>
//! placements/<kind>/<org>/<namespace>/<name>/<version>/<taskId>
//! ```
//!
//! Prefix scans are the only query mechanism; there is no secondary index.
//! The in-memory backend is suitable for development and testing. Production
//! deployments plug an etcd-style backend in behind the same trait.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod config_store;
pub mod kv;
pub mod placement_store;
pub mod records;

// Re-exports
pub use config_store::{ConfigStore, KvConfigStore};
pub use kv::{InMemoryKv, KvBackend, KvEntry, KvError, KvResult};
pub use placement_store::{KvPlacementStore, PlacementStore};
pub use records::StoredConfig;
