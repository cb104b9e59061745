//! Config services behind the API

mod config_service;

pub use config_service::{
    schema_document, ConfigGroupService, ConfigService, Gates, StandaloneConfigService,
};
