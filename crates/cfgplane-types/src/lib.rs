//! cfgplane Types - Core types for configuration distribution
//!
//! The control plane stores versioned configuration artifacts, computes
//! structural differences between versions, and tracks per-node delivery of
//! a configuration to the fleet.
//!
//! ## Key Concepts
//!
//! - **NamedParamSet**: a named key/value payload, the atomic unit of content
//! - **StandaloneConfig**: one versioned param set
//! - **ConfigGroup**: a versioned bundle of param sets released together
//! - **Config**: closed union over the two artifact kinds
//! - **Diff**: field-level change between two versions
//! - **PlacementTask**: one node's unit of delivery work
//!
//! Artifacts are immutable once created: `(org, namespace, name, version)`
//! identifies exactly one record and is never updated in place.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod clock;
pub mod config;
pub mod diff;
pub mod error;
pub mod ids;
pub mod placement;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    Config, ConfigArtifact, ConfigGroup, ConfigKind, ConfigMeta, NamedParamSet, StandaloneConfig,
    Versioned,
};
pub use diff::{Diff, DiffType, GroupDiff};
pub use error::{Error, ErrorKind, Result};
pub use ids::{ConfigId, NodeId, Org, TaskId};
pub use placement::{PlacementTask, TaskStatus};
