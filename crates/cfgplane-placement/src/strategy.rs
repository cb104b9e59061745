//! Node selection strategies
//!
//! A [`StrategyRequest`] is what callers send; [`PlacementStrategy`] is the
//! validated form. Validation failures are `SchemaInvalid`.

use crate::registry::{Node, NodeRegistry, Selector};
use cfgplane_types::{Error, Org, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Unvalidated strategy as supplied by a caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyRequest {
    pub name: String,
    #[serde(default)]
    pub query: Vec<Selector>,
    #[serde(default)]
    pub percentage: u32,
}

impl StrategyRequest {
    pub fn query(selectors: Vec<Selector>) -> Self {
        Self {
            name: "query".to_string(),
            query: selectors,
            percentage: 0,
        }
    }

    pub fn gossip(percentage: u32) -> Self {
        Self {
            name: "gossip".to_string(),
            query: Vec::new(),
            percentage,
        }
    }
}

/// Validated node selection policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementStrategy {
    /// Nodes matching every selector
    Query(Vec<Selector>),

    /// `ceil(total * percentage / 100)` nodes sampled without replacement
    Gossip { percentage: u32 },
}

impl PlacementStrategy {
    pub fn parse(request: &StrategyRequest) -> Result<Self> {
        match request.name.as_str() {
            "query" | "default" => {
                if request.query.is_empty() {
                    return Err(Error::SchemaInvalid(
                        "query is required for the query strategy".to_string(),
                    ));
                }
                Ok(PlacementStrategy::Query(request.query.clone()))
            }
            "gossip" => match request.percentage {
                0 => Err(Error::SchemaInvalid(
                    "percentage can't be 0 for the gossip strategy".to_string(),
                )),
                p if p > 100 => Err(Error::SchemaInvalid(format!(
                    "percentage can't exceed 100 for the gossip strategy: {p}"
                ))),
                percentage => Ok(PlacementStrategy::Gossip { percentage }),
            },
            other => Err(Error::SchemaInvalid(format!("unknown strategy: {other}"))),
        }
    }

    /// Name carried in dissemination commands
    pub fn name(&self) -> &'static str {
        match self {
            PlacementStrategy::Query(_) => "query",
            PlacementStrategy::Gossip { .. } => "gossip",
        }
    }

    /// Resolve the target nodes of `org`
    pub async fn select_nodes(&self, registry: &dyn NodeRegistry, org: &Org) -> Result<Vec<Node>> {
        match self {
            PlacementStrategy::Query(selectors) => Ok(registry.query_nodes(org, selectors).await?),
            PlacementStrategy::Gossip { percentage } => {
                let pool = registry.list_owned_nodes(org).await?;
                Ok(sample_nodes(&pool, *percentage, &mut rand::thread_rng()))
            }
        }
    }
}

/// Number of nodes a gossip placement reaches in a pool of `total`
pub fn gossip_count(total: usize, percentage: u32) -> usize {
    (total * percentage as usize).div_ceil(100).min(total)
}

/// Uniform sample without replacement
pub fn sample_nodes<R: Rng + ?Sized>(pool: &[Node], percentage: u32, rng: &mut R) -> Vec<Node> {
    pool.choose_multiple(rng, gossip_count(pool.len(), percentage))
        .cloned()
        .collect()
}
