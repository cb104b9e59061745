//! Config service
//!
//! One implementation serves both artifact kinds. Every operation checks
//! authorization first; store and validation errors propagate unchanged.

use crate::admin::{AdminClient, InheritanceRequest};
use crate::gates::{resource, Authorizer, Caller, NamespaceRegistry, Permission, SchemaRef, SchemaValidator};
use cfgplane_placement::{ConfigRef, PlacementEngine, PlacementStrategy, StrategyRequest};
use cfgplane_store::{ConfigStore, StoredConfig};
use cfgplane_types::{
    Clock, ConfigGroup, ConfigId, Error, Org, PlacementTask, Result, StandaloneConfig, Versioned,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Service for standalone configs
pub type StandaloneConfigService = ConfigService<StandaloneConfig>;

/// Service for config groups
pub type ConfigGroupService = ConfigService<ConfigGroup>;

/// Collaborators shared by the per-kind services
#[derive(Clone)]
pub struct Gates {
    pub authorizer: Arc<dyn Authorizer>,
    pub validator: Arc<dyn SchemaValidator>,
    pub namespaces: Arc<dyn NamespaceRegistry>,
    pub admin: AdminClient,
    pub clock: Arc<dyn Clock>,
}

/// Config operations for one artifact kind
pub struct ConfigService<C> {
    store: Arc<dyn ConfigStore<C>>,
    engine: Arc<PlacementEngine>,
    gates: Gates,
}

/// Render an artifact as the YAML document handed to the schema validator:
/// `{<set name>: {<key>: <value>}}`
pub fn schema_document<C: StoredConfig>(config: &C) -> Result<String> {
    let document: BTreeMap<&str, &BTreeMap<String, String>> = config
        .param_sets()
        .into_iter()
        .map(|ps| (ps.name.as_str(), &ps.params))
        .collect();
    serde_yaml::to_string(&document).map_err(|e| Error::Marshal(e.to_string()))
}

impl<C: StoredConfig> ConfigService<C> {
    pub fn new(store: Arc<dyn ConfigStore<C>>, engine: Arc<PlacementEngine>, gates: Gates) -> Self {
        Self {
            store,
            engine,
            gates,
        }
    }

    async fn authorize(&self, caller: &Caller, permission: Permission, resource: String) -> Result<()> {
        let authorizer = &self.gates.authorizer;
        if authorizer.authorize(caller, permission, &resource).await {
            return Ok(());
        }
        warn!(authorizer = authorizer.name(), permission = %permission, resource = %resource, "Request denied");
        Err(Error::Unauthorized(format!(
            "{permission} on {resource} denied by {}",
            authorizer.name()
        )))
    }

    fn config_resource(id: &ConfigId) -> String {
        resource::config(C::KIND, id)
    }

    /// Create a new config version
    #[instrument(skip_all, fields(kind = %C::KIND, config = %config.id()))]
    pub async fn put(&self, caller: &Caller, mut config: C, schema: Option<&SchemaRef>) -> Result<C> {
        let org = config.org().clone();
        let namespace = config.namespace().to_string();

        let exists = self
            .gates
            .namespaces
            .exists(&org, &namespace)
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;
        if !exists {
            return Err(Error::NotFound(format!("namespace {org}/{namespace}")));
        }

        self.authorize(caller, Permission::ConfigPut, resource::namespace(&org, &namespace))
            .await?;

        if let Some(schema) = schema {
            let document = schema_document(&config)?;
            let valid = self
                .gates
                .validator
                .validate(&org, schema, &document)
                .await
                .map_err(|e| Error::Internal(e.to_string()))?;
            if !valid {
                return Err(Error::SchemaInvalid(format!(
                    "config does not match schema {}@{}",
                    schema.name, schema.version
                )));
            }
        }

        config.meta_mut().created_at = self.gates.clock.now_unix();
        let created = self.store.put(config).await?;

        let request = InheritanceRequest {
            parent: resource::namespace(&org, &namespace),
            child: Self::config_resource(&created.id()),
        };
        self.gates.admin.register_inheritance(request, |result| match result {
            Ok(()) => info!("Inheritance registration completed"),
            Err(e) => warn!(error = %e, "Inheritance registration failed"),
        });

        info!("Config created");
        Ok(created)
    }

    pub async fn get(&self, caller: &Caller, id: &ConfigId) -> Result<C> {
        self.authorize(caller, Permission::ConfigGet, Self::config_resource(id))
            .await?;
        self.store.get(id).await
    }

    pub async fn list(&self, caller: &Caller, org: &Org, namespace: &str) -> Result<Vec<C>> {
        self.authorize(caller, Permission::ConfigGet, resource::namespace(org, namespace))
            .await?;
        self.store.list(org, namespace).await
    }

    #[instrument(skip_all, fields(kind = %C::KIND, config = %id))]
    pub async fn delete(&self, caller: &Caller, id: &ConfigId) -> Result<C> {
        self.authorize(caller, Permission::ConfigPut, Self::config_resource(id))
            .await?;
        let removed = self.store.delete(id).await?;
        info!("Config deleted");
        Ok(removed)
    }

    /// Changes from the `reference` version to the `new` version
    pub async fn diff(&self, caller: &Caller, reference: &ConfigId, new: &ConfigId) -> Result<C::DiffOutput> {
        self.authorize(caller, Permission::ConfigGet, Self::config_resource(reference))
            .await?;
        self.authorize(caller, Permission::ConfigGet, Self::config_resource(new))
            .await?;

        let reference = self.store.get(reference).await?;
        let new = self.store.get(new).await?;
        Ok(new.diff(&reference))
    }

    pub async fn place(&self, caller: &Caller, id: &ConfigId, strategy: &StrategyRequest) -> Result<Vec<PlacementTask>> {
        self.authorize(caller, Permission::ConfigGet, Self::config_resource(id))
            .await?;
        self.authorize(caller, Permission::NamespacePut, resource::namespace(&id.org, &id.namespace))
            .await?;

        let strategy = PlacementStrategy::parse(strategy)?;
        self.engine
            .place(&ConfigRef::new(C::KIND, id.clone()), &strategy)
            .await
    }

    pub async fn list_tasks(&self, caller: &Caller, id: &ConfigId) -> Result<Vec<PlacementTask>> {
        self.authorize(caller, Permission::ConfigGet, Self::config_resource(id))
            .await?;
        self.engine
            .list_tasks(&ConfigRef::new(C::KIND, id.clone()))
            .await
    }
}
