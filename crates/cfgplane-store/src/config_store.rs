//! Versioned config store
//!
//! Artifacts are create-only: `put` succeeds at most once per
//! `(org, namespace, name, version)` and per kind, enforced by a single
//! create-if-absent write against the backend. There is no update; a new
//! version is a new record.

use crate::kv::KvBackend;
use crate::records::{self, StoredConfig};
use async_trait::async_trait;
use cfgplane_types::{ConfigId, Error, Org, Result};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// Persistence contract for one artifact kind
#[async_trait]
pub trait ConfigStore<C>: Send + Sync {
    /// Create an artifact. Fails with `VersionExists` if the key is taken.
    async fn put(&self, config: C) -> Result<C>;

    async fn get(&self, id: &ConfigId) -> Result<C>;

    /// Every artifact of this kind in `(org, namespace)`. Records that fail
    /// to decode are logged and skipped.
    async fn list(&self, org: &Org, namespace: &str) -> Result<Vec<C>>;

    /// Remove an artifact, returning it as it was stored
    async fn delete(&self, id: &ConfigId) -> Result<C>;
}

/// [`ConfigStore`] over any [`KvBackend`]
pub struct KvConfigStore<C> {
    kv: Arc<dyn KvBackend>,
    _kind: PhantomData<fn() -> C>,
}

impl<C> KvConfigStore<C> {
    pub fn new(kv: Arc<dyn KvBackend>) -> Self {
        Self {
            kv,
            _kind: PhantomData,
        }
    }
}

impl<C> Clone for KvConfigStore<C> {
    fn clone(&self) -> Self {
        Self::new(self.kv.clone())
    }
}

#[async_trait]
impl<C: StoredConfig> ConfigStore<C> for KvConfigStore<C> {
    async fn put(&self, config: C) -> Result<C> {
        let id = config.id();
        records::check_segments(&id)?;

        let key = records::config_key(C::KIND, &id);
        let value = config.encode()?;

        if !self.kv.put_if_absent(&key, value).await? {
            return Err(Error::VersionExists(format!("{} {}", C::KIND, id)));
        }

        debug!(key = %key, "Stored config");
        Ok(config)
    }

    async fn get(&self, id: &ConfigId) -> Result<C> {
        records::check_segments(id)?;
        let key = records::config_key(C::KIND, id);
        match self.kv.get(&key).await? {
            Some(entry) => C::decode(&entry.value),
            None => Err(Error::NotFound(format!("{} {}", C::KIND, id))),
        }
    }

    async fn list(&self, org: &Org, namespace: &str) -> Result<Vec<C>> {
        records::check_scope(org, namespace)?;
        let prefix = records::namespace_prefix(C::KIND, org, namespace);
        let entries = self.kv.get_prefix(&prefix).await?;

        let mut configs = Vec::with_capacity(entries.len());
        for entry in entries {
            match C::decode(&entry.value) {
                Ok(config) => configs.push(config),
                Err(e) => warn!(key = %entry.key, error = %e, "Skipping undecodable config record"),
            }
        }
        Ok(configs)
    }

    async fn delete(&self, id: &ConfigId) -> Result<C> {
        records::check_segments(id)?;
        let key = records::config_key(C::KIND, id);
        match self.kv.delete(&key).await? {
            Some(entry) => C::decode(&entry.value),
            None => Err(Error::NotFound(format!("{} {}", C::KIND, id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryKv;
    use cfgplane_types::{ConfigGroup, NamedParamSet, StandaloneConfig, Versioned};

    fn standalone(name: &str, version: &str, replicas: &str) -> StandaloneConfig {
        StandaloneConfig::new(
            Org::new("acme"),
            "prod",
            version,
            NamedParamSet::from_pairs(name, [("replicas", replicas)]),
        )
    }

    fn stores() -> (Arc<InMemoryKv>, KvConfigStore<StandaloneConfig>, KvConfigStore<ConfigGroup>) {
        let kv = Arc::new(InMemoryKv::new());
        (
            kv.clone(),
            KvConfigStore::new(kv.clone()),
            KvConfigStore::new(kv),
        )
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let (_, store, _) = stores();
        store.put(standalone("svc", "v1", "3")).await.unwrap();

        let fetched = store.get(&ConfigId::new("acme", "prod", "svc", "v1")).await.unwrap();
        assert_eq!(fetched.param_set.get("replicas"), Some("3"));
    }

    #[tokio::test]
    async fn test_put_is_create_only() {
        let (_, store, _) = stores();
        store.put(standalone("svc", "v1", "3")).await.unwrap();

        let err = store.put(standalone("svc", "v1", "5")).await.unwrap_err();
        assert!(matches!(err, Error::VersionExists(_)));

        let fetched = store.get(&ConfigId::new("acme", "prod", "svc", "v1")).await.unwrap();
        assert_eq!(fetched.param_set.get("replicas"), Some("3"));
    }

    #[tokio::test]
    async fn test_concurrent_puts_have_one_winner() {
        let (_, store, _) = stores();
        let store = Arc::new(store);

        let attempts = (0..8).map(|i| {
            let store = store.clone();
            async move { store.put(standalone("svc", "v1", &i.to_string())).await }
        });
        let results = futures::future::join_all(attempts).await;

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, Error::VersionExists(_))));
    }

    #[tokio::test]
    async fn test_kinds_do_not_collide() {
        let (_, standalone_store, group_store) = stores();
        standalone_store.put(standalone("svc", "v1", "3")).await.unwrap();

        let group = ConfigGroup::new(Org::new("acme"), "prod", "svc", "v1", vec![]);
        group_store.put(group).await.unwrap();

        let id = ConfigId::new("acme", "prod", "svc", "v1");
        assert!(group_store.get(&id).await.unwrap().param_sets.is_empty());
        assert!(standalone_store.get(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_records() {
        let (kv, store, _) = stores();
        store.put(standalone("a", "v1", "1")).await.unwrap();
        store.put(standalone("b", "v1", "2")).await.unwrap();
        kv.put("standalone/acme/prod/c/v1", b"garbage".to_vec())
            .await
            .unwrap();
        store
            .put(StandaloneConfig::new(
                Org::new("acme"),
                "staging",
                "v1",
                NamedParamSet::from_pairs("d", [("x", "1")]),
            ))
            .await
            .unwrap();

        let listed = store.list(&Org::new("acme"), "prod").await.unwrap();
        let names: Vec<_> = listed.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_delete_returns_removed() {
        let (_, store, _) = stores();
        store.put(standalone("svc", "v1", "3")).await.unwrap();

        let id = ConfigId::new("acme", "prod", "svc", "v1");
        let removed = store.delete(&id).await.unwrap();
        assert_eq!(removed.param_set.get("replicas"), Some("3"));

        assert!(matches!(store.get(&id).await, Err(Error::NotFound(_))));
        assert!(matches!(store.delete(&id).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_slash_in_name_rejected() {
        let (_, store, _) = stores();
        let err = store.put(standalone("a/b", "v1", "3")).await.unwrap_err();
        assert!(matches!(err, Error::SchemaInvalid(_)));
    }

    #[tokio::test]
    async fn test_reads_reject_slash_in_scope() {
        let (_, store, _) = stores();
        store.put(standalone("svc", "v1", "3")).await.unwrap();

        let err = store.list(&Org::new("acme"), "prod/svc").await.unwrap_err();
        assert!(matches!(err, Error::SchemaInvalid(_)));
        let err = store.list(&Org::new("acme"), "").await.unwrap_err();
        assert!(matches!(err, Error::SchemaInvalid(_)));

        let nested = ConfigId::new("acme", "prod/svc", "v1", "x");
        assert!(matches!(store.get(&nested).await, Err(Error::SchemaInvalid(_))));
        assert!(matches!(store.delete(&nested).await, Err(Error::SchemaInvalid(_))));

        let id = ConfigId::new("acme", "prod", "svc", "v1");
        assert!(store.get(&id).await.is_ok());
    }
}
