//! Persisted record shapes and key construction
//!
//! Records are self-describing JSON. The record structs are kept separate
//! from the domain types so the domain can evolve without rewriting stored
//! data.

use cfgplane_types::{
    ConfigArtifact, ConfigGroup, ConfigId, ConfigKind, ConfigMeta, Error, NamedParamSet, NodeId,
    Org, PlacementTask, Result, StandaloneConfig, TaskId, TaskStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const PLACEMENTS_PREFIX: &str = "placements";

/// Key of one artifact
pub fn config_key(kind: ConfigKind, id: &ConfigId) -> String {
    format!(
        "{}/{}/{}/{}/{}",
        kind.key_prefix(),
        id.org,
        id.namespace,
        id.name,
        id.version
    )
}

/// Prefix covering every artifact of `kind` in one namespace
pub fn namespace_prefix(kind: ConfigKind, org: &Org, namespace: &str) -> String {
    format!("{}/{}/{}/", kind.key_prefix(), org, namespace)
}

/// Key of one placement task
pub fn task_key(kind: ConfigKind, id: &ConfigId, task_id: &TaskId) -> String {
    format!("{}{}", task_prefix(kind, id), task_id)
}

/// Prefix covering every task of one artifact
pub fn task_prefix(kind: ConfigKind, id: &ConfigId) -> String {
    format!(
        "{}/{}/{}/{}/{}/{}/",
        PLACEMENTS_PREFIX,
        kind.key_prefix(),
        id.org,
        id.namespace,
        id.name,
        id.version
    )
}

fn check_segment(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::SchemaInvalid(format!("{field} must not be empty")));
    }
    if value.contains('/') {
        return Err(Error::SchemaInvalid(format!(
            "{field} must not contain '/': {value}"
        )));
    }
    Ok(())
}

/// Reject an `(org, namespace)` pair that would break the key layout.
///
/// Segments are joined with `/`, so an empty segment or one containing `/`
/// would make prefix scans match foreign records.
pub fn check_scope(org: &Org, namespace: &str) -> Result<()> {
    check_segment("org", org.as_str())?;
    check_segment("namespace", namespace)
}

/// Reject identifiers that would break the key layout.
pub fn check_segments(id: &ConfigId) -> Result<()> {
    check_scope(&id.org, &id.namespace)?;
    check_segment("name", &id.name)?;
    check_segment("version", &id.version)
}

/// An artifact kind that knows its persisted representation
pub trait StoredConfig: ConfigArtifact + Sized {
    fn encode(&self) -> Result<Vec<u8>>;

    fn decode(bytes: &[u8]) -> Result<Self>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StandaloneConfigRecord {
    org: String,
    namespace: String,
    name: String,
    version: String,
    created_at: i64,
    param_set: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ParamSetRecord {
    name: String,
    param_set: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigGroupRecord {
    org: String,
    namespace: String,
    name: String,
    version: String,
    created_at: i64,
    param_sets: Vec<ParamSetRecord>,
}

fn meta_from(org: String, namespace: String, version: String, created_at: i64) -> ConfigMeta {
    ConfigMeta {
        org: Org::new(org),
        namespace,
        version,
        created_at,
    }
}

impl StoredConfig for StandaloneConfig {
    fn encode(&self) -> Result<Vec<u8>> {
        let record = StandaloneConfigRecord {
            org: self.meta.org.to_string(),
            namespace: self.meta.namespace.clone(),
            name: self.param_set.name.clone(),
            version: self.meta.version.clone(),
            created_at: self.meta.created_at,
            param_set: self.param_set.params.clone(),
        };
        Ok(serde_json::to_vec(&record)?)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let record: StandaloneConfigRecord = serde_json::from_slice(bytes)?;
        Ok(StandaloneConfig {
            meta: meta_from(record.org, record.namespace, record.version, record.created_at),
            param_set: NamedParamSet::new(record.name, record.param_set),
        })
    }
}

impl StoredConfig for ConfigGroup {
    fn encode(&self) -> Result<Vec<u8>> {
        let record = ConfigGroupRecord {
            org: self.meta.org.to_string(),
            namespace: self.meta.namespace.clone(),
            name: self.name.clone(),
            version: self.meta.version.clone(),
            created_at: self.meta.created_at,
            param_sets: self
                .param_sets
                .iter()
                .map(|ps| ParamSetRecord {
                    name: ps.name.clone(),
                    param_set: ps.params.clone(),
                })
                .collect(),
        };
        Ok(serde_json::to_vec(&record)?)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let record: ConfigGroupRecord = serde_json::from_slice(bytes)?;
        Ok(ConfigGroup {
            meta: meta_from(record.org, record.namespace, record.version, record.created_at),
            name: record.name,
            param_sets: record
                .param_sets
                .into_iter()
                .map(|ps| NamedParamSet::new(ps.name, ps.param_set))
                .collect(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PlacementTaskRecord {
    id: String,
    node: String,
    kind: ConfigKind,
    org: String,
    namespace: String,
    name: String,
    version: String,
    status: TaskStatus,
    accepted_at: i64,
    resolved_at: i64,
}

impl PlacementTaskRecord {
    pub(crate) fn encode(task: &PlacementTask) -> Result<Vec<u8>> {
        let record = PlacementTaskRecord {
            id: task.id.to_string(),
            node: task.node.to_string(),
            kind: task.kind,
            org: task.config.org.to_string(),
            namespace: task.config.namespace.clone(),
            name: task.config.name.clone(),
            version: task.config.version.clone(),
            status: task.status,
            accepted_at: task.accepted_at,
            resolved_at: task.resolved_at,
        };
        Ok(serde_json::to_vec(&record)?)
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<PlacementTask> {
        let record: PlacementTaskRecord = serde_json::from_slice(bytes)?;
        Ok(PlacementTask {
            id: TaskId::new(record.id),
            node: NodeId::new(record.node),
            kind: record.kind,
            config: ConfigId::new(record.org, record.namespace, record.name, record.version),
            status: record.status,
            accepted_at: record.accepted_at,
            resolved_at: record.resolved_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let id = ConfigId::new("acme", "prod", "svc", "v1");
        assert_eq!(
            config_key(ConfigKind::Standalone, &id),
            "standalone/acme/prod/svc/v1"
        );
        assert_eq!(config_key(ConfigKind::Group, &id), "groups/acme/prod/svc/v1");
        assert_eq!(
            task_key(ConfigKind::Standalone, &id, &TaskId::new("t1")),
            "placements/standalone/acme/prod/svc/v1/t1"
        );
        assert_eq!(
            namespace_prefix(ConfigKind::Group, &Org::new("acme"), "prod"),
            "groups/acme/prod/"
        );
    }

    #[test]
    fn test_segments_rejected() {
        assert!(check_segments(&ConfigId::new("acme", "prod", "svc", "v1")).is_ok());

        let err = check_segments(&ConfigId::new("acme", "", "svc", "v1")).unwrap_err();
        assert!(matches!(err, Error::SchemaInvalid(_)));

        let err = check_segments(&ConfigId::new("acme", "prod", "a/b", "v1")).unwrap_err();
        assert!(matches!(err, Error::SchemaInvalid(_)));

        assert!(check_scope(&Org::new("acme"), "prod").is_ok());
        let err = check_scope(&Org::new("acme"), "prod/svc").unwrap_err();
        assert!(matches!(err, Error::SchemaInvalid(_)));
    }

    #[test]
    fn test_task_record_names_its_config() {
        let mut task = PlacementTask::accepted(
            TaskId::new("t1"),
            NodeId::new("node-1"),
            ConfigKind::Group,
            ConfigId::new("acme", "prod", "stack", "v3"),
            100,
        );
        task.resolve(TaskStatus::Placed, 140).unwrap();

        let bytes = PlacementTaskRecord::encode(&task).unwrap();
        let raw: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(raw["kind"], "group");
        assert_eq!(raw["org"], "acme");
        assert_eq!(raw["namespace"], "prod");
        assert_eq!(raw["name"], "stack");
        assert_eq!(raw["version"], "v3");

        assert_eq!(PlacementTaskRecord::decode(&bytes).unwrap(), task);
    }

    #[test]
    fn test_group_record_preserves_subsets() {
        let mut group = ConfigGroup::new(
            Org::new("acme"),
            "prod",
            "stack",
            "v3",
            vec![
                NamedParamSet::from_pairs("db", [("port", "5432")]),
                NamedParamSet::from_pairs("cache", [("ttl", "60")]),
            ],
        );
        group.meta.created_at = 42;

        let decoded = ConfigGroup::decode(&group.encode().unwrap()).unwrap();
        assert_eq!(decoded, group);
    }

    #[test]
    fn test_garbage_is_marshal_failure() {
        let err = StandaloneConfig::decode(b"{not json").unwrap_err();
        assert!(matches!(err, Error::Marshal(_)));
    }
}
