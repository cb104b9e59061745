//! cfgplane daemon library
//!
//! Components of the control plane daemon:
//! - config API for standalone configs and config groups
//! - placement API and the reply webhooks nodes report back to
//! - authorization, schema and namespace gates
//! - server lifecycle management

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod admin;
pub mod api;
pub mod config;
pub mod error;
pub mod gates;
pub mod server;
pub mod services;

pub use admin::{AdminClient, InheritanceRegistry, InheritanceRequest, LoggingInheritanceRegistry};
pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError, DaemonResult};
pub use gates::{Authorizer, Caller, NamespaceRegistry, Permission, SchemaRef, SchemaValidator};
pub use server::{Components, Server, Wiring};
pub use services::{ConfigGroupService, ConfigService, Gates, StandaloneConfigService};
