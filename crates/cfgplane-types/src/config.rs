//! Configuration artifacts
//!
//! Two artifact kinds exist and only two ever will: a [`StandaloneConfig`]
//! carries one [`NamedParamSet`], a [`ConfigGroup`] carries several released
//! together. Both embed the same [`ConfigMeta`] by value and expose it
//! through [`Versioned`], so key construction and authorization can treat
//! either kind uniformly. [`Config`] is the closed union used where a value
//! of either kind has to travel (placement, snapshots).

use crate::diff::{Diff, GroupDiff};
use crate::ids::{ConfigId, Org};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Artifact kind discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigKind {
    Standalone,
    Group,
}

impl ConfigKind {
    /// Wire name used in dissemination commands
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKind::Standalone => "standalone",
            ConfigKind::Group => "group",
        }
    }

    /// First segment of every persisted key for this kind
    pub fn key_prefix(&self) -> &'static str {
        match self {
            ConfigKind::Standalone => "standalone",
            ConfigKind::Group => "groups",
        }
    }

    /// Path of the reply webhook that resolves tasks of this kind
    pub fn webhook_path(&self) -> &'static str {
        match self {
            ConfigKind::Standalone => "/standalone",
            ConfigKind::Group => "/groups",
        }
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields shared by every artifact kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigMeta {
    pub org: Org,
    pub namespace: String,
    pub version: String,
    /// Unix seconds; stamped by the service on `Put`
    #[serde(default)]
    pub created_at: i64,
}

impl ConfigMeta {
    pub fn new(org: Org, namespace: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            org,
            namespace: namespace.into(),
            version: version.into(),
            created_at: 0,
        }
    }
}

/// Shared accessors over both artifact kinds
pub trait Versioned {
    fn meta(&self) -> &ConfigMeta;

    fn name(&self) -> &str;

    fn kind(&self) -> ConfigKind;

    fn org(&self) -> &Org {
        &self.meta().org
    }

    fn namespace(&self) -> &str {
        &self.meta().namespace
    }

    fn version(&self) -> &str {
        &self.meta().version
    }

    fn created_at(&self) -> i64 {
        self.meta().created_at
    }

    fn created_at_utc(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(self.created_at(), 0).unwrap_or_default()
    }

    fn id(&self) -> ConfigId {
        ConfigId {
            org: self.org().clone(),
            namespace: self.namespace().to_string(),
            name: self.name().to_string(),
            version: self.version().to_string(),
        }
    }
}

/// Kind-specific behavior needed by the generic store and service layers
pub trait ConfigArtifact: Versioned + Clone + Send + Sync + 'static {
    const KIND: ConfigKind;

    /// Output of [`ConfigArtifact::diff`]
    type DiffOutput: Serialize + Send;

    fn meta_mut(&mut self) -> &mut ConfigMeta;

    fn param_sets(&self) -> Vec<&NamedParamSet>;

    /// Changes from `reference` to `self`
    fn diff(&self, reference: &Self) -> Self::DiffOutput;

    fn into_config(self) -> Config;
}

/// A named key/value configuration payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedParamSet {
    pub name: String,
    pub params: BTreeMap<String, String>,
}

impl NamedParamSet {
    pub fn new(name: impl Into<String>, params: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    pub fn from_pairs<K, V>(name: impl Into<String>, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            name,
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Configuration of a single component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandaloneConfig {
    pub meta: ConfigMeta,
    pub param_set: NamedParamSet,
}

impl StandaloneConfig {
    pub fn new(
        org: Org,
        namespace: impl Into<String>,
        version: impl Into<String>,
        param_set: NamedParamSet,
    ) -> Self {
        Self {
            meta: ConfigMeta::new(org, namespace, version),
            param_set,
        }
    }
}

impl Versioned for StandaloneConfig {
    fn meta(&self) -> &ConfigMeta {
        &self.meta
    }

    fn name(&self) -> &str {
        &self.param_set.name
    }

    fn kind(&self) -> ConfigKind {
        ConfigKind::Standalone
    }
}

impl ConfigArtifact for StandaloneConfig {
    const KIND: ConfigKind = ConfigKind::Standalone;
    type DiffOutput = Vec<Diff>;

    fn meta_mut(&mut self) -> &mut ConfigMeta {
        &mut self.meta
    }

    fn param_sets(&self) -> Vec<&NamedParamSet> {
        vec![&self.param_set]
    }

    fn diff(&self, reference: &Self) -> Vec<Diff> {
        self.param_set.diff(&reference.param_set)
    }

    fn into_config(self) -> Config {
        Config::Standalone(self)
    }
}

/// Configuration for a set of related components released together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigGroup {
    pub meta: ConfigMeta,
    pub name: String,
    pub param_sets: Vec<NamedParamSet>,
}

impl ConfigGroup {
    pub fn new(
        org: Org,
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        param_sets: Vec<NamedParamSet>,
    ) -> Self {
        Self {
            meta: ConfigMeta::new(org, namespace, version),
            name: name.into(),
            param_sets,
        }
    }

    /// Look up a sub-set by name
    pub fn param_set(&self, name: &str) -> Option<&NamedParamSet> {
        self.param_sets.iter().find(|ps| ps.name == name)
    }
}

impl Versioned for ConfigGroup {
    fn meta(&self) -> &ConfigMeta {
        &self.meta
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ConfigKind {
        ConfigKind::Group
    }
}

impl ConfigArtifact for ConfigGroup {
    const KIND: ConfigKind = ConfigKind::Group;
    type DiffOutput = GroupDiff;

    fn meta_mut(&mut self) -> &mut ConfigMeta {
        &mut self.meta
    }

    fn param_sets(&self) -> Vec<&NamedParamSet> {
        self.param_sets.iter().collect()
    }

    fn diff(&self, reference: &Self) -> GroupDiff {
        ConfigGroup::diff(self, reference)
    }

    fn into_config(self) -> Config {
        Config::Group(self)
    }
}

/// Closed union over the artifact kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Config {
    Standalone(StandaloneConfig),
    Group(ConfigGroup),
}

impl Versioned for Config {
    fn meta(&self) -> &ConfigMeta {
        match self {
            Config::Standalone(c) => c.meta(),
            Config::Group(c) => c.meta(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Config::Standalone(c) => c.name(),
            Config::Group(c) => c.name(),
        }
    }

    fn kind(&self) -> ConfigKind {
        match self {
            Config::Standalone(_) => ConfigKind::Standalone,
            Config::Group(_) => ConfigKind::Group,
        }
    }
}

impl From<StandaloneConfig> for Config {
    fn from(config: StandaloneConfig) -> Self {
        Config::Standalone(config)
    }
}

impl From<ConfigGroup> for Config {
    fn from(config: ConfigGroup) -> Self {
        Config::Group(config)
    }
}
