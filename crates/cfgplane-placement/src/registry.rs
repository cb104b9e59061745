//! Node registry contract and the in-memory registry

use crate::error::RegistryError;
use async_trait::async_trait;
use cfgplane_types::{NodeId, Org};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// A fleet member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(id),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Comparison applied by a [`Selector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equal,
    NotEqual,
}

/// Label predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    pub label_key: String,
    pub should_be: Operator,
    pub value: String,
}

impl Selector {
    pub fn equal(label_key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label_key: label_key.into(),
            should_be: Operator::Equal,
            value: value.into(),
        }
    }

    pub fn not_equal(label_key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label_key: label_key.into(),
            should_be: Operator::NotEqual,
            value: value.into(),
        }
    }

    /// A node without the label satisfies `NotEqual` and never `Equal`.
    pub fn matches(&self, node: &Node) -> bool {
        let label = node.labels.get(&self.label_key);
        match self.should_be {
            Operator::Equal => label == Some(&self.value),
            Operator::NotEqual => label != Some(&self.value),
        }
    }
}

/// Fleet inventory consulted by placement strategies
#[async_trait]
pub trait NodeRegistry: Send + Sync {
    /// Nodes of `org` matching every selector
    async fn query_nodes(&self, org: &Org, selectors: &[Selector]) -> RegistryResult<Vec<Node>>;

    /// Every node owned by `org`
    async fn list_owned_nodes(&self, org: &Org) -> RegistryResult<Vec<Node>>;
}

/// Static in-memory inventory for development and testing
#[derive(Debug, Default)]
pub struct InMemoryNodeRegistry {
    nodes: DashMap<Org, Vec<Node>>,
}

impl InMemoryNodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a node in an org's pool
    pub fn register(&self, org: &Org, node: Node) {
        let mut pool = self.nodes.entry(org.clone()).or_default();
        pool.retain(|n| n.id != node.id);
        pool.push(node);
    }
}

#[async_trait]
impl NodeRegistry for InMemoryNodeRegistry {
    async fn query_nodes(&self, org: &Org, selectors: &[Selector]) -> RegistryResult<Vec<Node>> {
        Ok(self
            .nodes
            .get(org)
            .map(|pool| {
                pool.iter()
                    .filter(|n| selectors.iter().all(|s| s.matches(n)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_owned_nodes(&self, org: &Org) -> RegistryResult<Vec<Node>> {
        Ok(self
            .nodes
            .get(org)
            .map(|pool| pool.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (InMemoryNodeRegistry, Org) {
        let org = Org::new("acme");
        let registry = InMemoryNodeRegistry::new();
        registry.register(&org, Node::new("n1").with_label("zone", "eu").with_label("tier", "edge"));
        registry.register(&org, Node::new("n2").with_label("zone", "us").with_label("tier", "edge"));
        registry.register(&org, Node::new("n3").with_label("zone", "eu"));
        registry.register(&Org::new("other"), Node::new("x1").with_label("zone", "eu"));
        (registry, org)
    }

    fn ids(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_selectors_are_conjunctive() {
        let (registry, org) = registry();
        let nodes = registry
            .query_nodes(
                &org,
                &[Selector::equal("zone", "eu"), Selector::equal("tier", "edge")],
            )
            .await
            .unwrap();
        assert_eq!(ids(&nodes), vec!["n1"]);
    }

    #[tokio::test]
    async fn test_not_equal_includes_unlabelled() {
        let (registry, org) = registry();
        let nodes = registry
            .query_nodes(&org, &[Selector::not_equal("tier", "edge")])
            .await
            .unwrap();
        assert_eq!(ids(&nodes), vec!["n3"]);
    }

    #[tokio::test]
    async fn test_pools_are_per_org() {
        let (registry, org) = registry();
        assert_eq!(registry.list_owned_nodes(&org).await.unwrap().len(), 3);
        assert!(registry
            .list_owned_nodes(&Org::new("nobody"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_register_replaces_by_id() {
        let (registry, org) = registry();
        let before = registry.list_owned_nodes(&org).await.unwrap().len();

        registry.register(&org, Node::new("n1").with_label("zone", "ap"));
        let nodes = registry.query_nodes(&org, &[Selector::equal("zone", "ap")]).await.unwrap();
        assert_eq!(ids(&nodes), vec!["n1"]);
        assert_eq!(registry.list_owned_nodes(&org).await.unwrap().len(), before);
    }
}
