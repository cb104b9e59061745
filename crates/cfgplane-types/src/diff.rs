//! Diff engine
//!
//! Reduces two configuration versions to field-level changes. Comparison is
//! directional: keys only in the new version are additions, keys only in the
//! reference are deletions. Output order is stable for a given pair of
//! inputs but carries no meaning.

use crate::config::{ConfigGroup, NamedParamSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Per sub-set diffs of a config group, keyed by sub-set name
pub type GroupDiff = BTreeMap<String, Vec<Diff>>;

/// Discriminant of a [`Diff`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffType {
    Addition,
    #[serde(rename = "replacement")]
    Replace,
    Deletion,
}

impl fmt::Display for DiffType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffType::Addition => f.write_str("addition"),
            DiffType::Replace => f.write_str("replacement"),
            DiffType::Deletion => f.write_str("deletion"),
        }
    }
}

/// A single key-level change
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Diff {
    /// Key present in new, absent in reference
    Addition { key: String, value: String },

    /// Key present in both with a different value
    #[serde(rename = "replacement")]
    Replace {
        key: String,
        #[serde(rename = "old_value")]
        old: String,
        #[serde(rename = "new_value")]
        new: String,
    },

    /// Key present in reference, absent in new
    Deletion { key: String, value: String },
}

impl Diff {
    pub fn diff_type(&self) -> DiffType {
        match self {
            Diff::Addition { .. } => DiffType::Addition,
            Diff::Replace { .. } => DiffType::Replace,
            Diff::Deletion { .. } => DiffType::Deletion,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Diff::Addition { key, .. } | Diff::Replace { key, .. } | Diff::Deletion { key, .. } => {
                key
            }
        }
    }

    fn addition(key: &str, value: &str) -> Self {
        Diff::Addition {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    fn deletion(key: &str, value: &str) -> Self {
        Diff::Deletion {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

impl NamedParamSet {
    /// Changes that turn `reference` into `self`
    pub fn diff(&self, reference: &NamedParamSet) -> Vec<Diff> {
        let mut diffs = Vec::new();

        for (key, value) in &self.params {
            match reference.params.get(key) {
                None => diffs.push(Diff::addition(key, value)),
                Some(old) if old != value => diffs.push(Diff::Replace {
                    key: key.clone(),
                    old: old.clone(),
                    new: value.clone(),
                }),
                Some(_) => {}
            }
        }

        for (key, value) in &reference.params {
            if !self.params.contains_key(key) {
                diffs.push(Diff::deletion(key, value));
            }
        }

        diffs
    }

    fn all_additions(&self) -> Vec<Diff> {
        self.params
            .iter()
            .map(|(k, v)| Diff::addition(k, v))
            .collect()
    }

    fn all_deletions(&self) -> Vec<Diff> {
        self.params
            .iter()
            .map(|(k, v)| Diff::deletion(k, v))
            .collect()
    }
}

impl ConfigGroup {
    /// Per sub-set changes that turn `reference` into `self`.
    ///
    /// Sub-sets added or removed wholesale contribute one diff per key they
    /// contain. Sub-sets without changes are left out of the map.
    pub fn diff(&self, reference: &ConfigGroup) -> GroupDiff {
        let mut diffs = GroupDiff::new();

        for new_set in &self.param_sets {
            let set_diffs = match reference.param_set(&new_set.name) {
                Some(reference_set) => new_set.diff(reference_set),
                None => new_set.all_additions(),
            };
            if !set_diffs.is_empty() {
                diffs
                    .entry(new_set.name.clone())
                    .or_default()
                    .extend(set_diffs);
            }
        }

        for reference_set in &reference.param_sets {
            if self.param_set(&reference_set.name).is_none() {
                let set_diffs = reference_set.all_deletions();
                if !set_diffs.is_empty() {
                    diffs
                        .entry(reference_set.name.clone())
                        .or_default()
                        .extend(set_diffs);
                }
            }
        }

        diffs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Org;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn set(name: &str, pairs: &[(&str, &str)]) -> NamedParamSet {
        NamedParamSet::from_pairs(name, pairs.iter().copied())
    }

    fn group(sets: Vec<NamedParamSet>) -> ConfigGroup {
        ConfigGroup::new(Org::new("acme"), "prod", "stack", "v1", sets)
    }

    #[test]
    fn test_diff_correctness() {
        let reference = set("svc", &[("a", "1"), ("b", "2")]);
        let new = set("svc", &[("b", "3"), ("c", "4")]);

        let diffs: HashSet<Diff> = new.diff(&reference).into_iter().collect();
        let expected: HashSet<Diff> = [
            Diff::Deletion {
                key: "a".into(),
                value: "1".into(),
            },
            Diff::Replace {
                key: "b".into(),
                old: "2".into(),
                new: "3".into(),
            },
            Diff::Addition {
                key: "c".into(),
                value: "4".into(),
            },
        ]
        .into_iter()
        .collect();

        assert_eq!(diffs, expected);
    }

    #[test]
    fn test_group_subset_removed_yields_deletions() {
        let reference = group(vec![
            set("db", &[("port", "5432")]),
            set("cache", &[("ttl", "60"), ("size", "10")]),
        ]);
        let new = group(vec![set("db", &[("port", "5432")])]);

        let diffs = new.diff(&reference);
        assert_eq!(diffs.len(), 1);
        let cache = &diffs["cache"];
        assert_eq!(cache.len(), 2);
        assert!(cache.iter().all(|d| d.diff_type() == DiffType::Deletion));
    }

    #[test]
    fn test_group_subset_added_yields_additions() {
        let reference = group(vec![set("db", &[("port", "5432")])]);
        let new = group(vec![
            set("db", &[("port", "5433")]),
            set("queue", &[("depth", "100"), ("workers", "4"), ("dlq", "on")]),
        ]);

        let diffs = new.diff(&reference);
        assert_eq!(diffs["queue"].len(), 3);
        assert!(diffs["queue"]
            .iter()
            .all(|d| d.diff_type() == DiffType::Addition));
        assert_eq!(
            diffs["db"],
            vec![Diff::Replace {
                key: "port".into(),
                old: "5432".into(),
                new: "5433".into(),
            }]
        );
    }

    #[test]
    fn test_identical_groups_have_empty_diff() {
        let g = group(vec![set("db", &[("port", "5432")]), set("cache", &[])]);
        assert!(g.diff(&g.clone()).is_empty());
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(Diff::Replace {
            key: "b".into(),
            old: "2".into(),
            new: "3".into(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "replacement", "key": "b", "old_value": "2", "new_value": "3"})
        );
    }

    fn arb_param_set() -> impl Strategy<Value = NamedParamSet> {
        prop::collection::btree_map("[a-e]{1,2}", "[0-3]{1}", 0..8)
            .prop_map(|params| NamedParamSet::new("svc", params))
    }

    proptest! {
        #[test]
        fn prop_diff_identity_is_empty(x in arb_param_set()) {
            prop_assert!(x.diff(&x).is_empty());
        }

        #[test]
        fn prop_diff_is_directional(a in arb_param_set(), b in arb_param_set()) {
            let forward = a.diff(&b);
            let backward = b.diff(&a);
            prop_assert_eq!(forward.len(), backward.len());

            let additions = forward.iter().filter(|d| d.diff_type() == DiffType::Addition).count();
            let deletions = backward.iter().filter(|d| d.diff_type() == DiffType::Deletion).count();
            prop_assert_eq!(additions, deletions);
        }

        #[test]
        fn prop_keys_are_unique(a in arb_param_set(), b in arb_param_set()) {
            let diffs = a.diff(&b);
            let keys: HashSet<&str> = diffs.iter().map(Diff::key).collect();
            prop_assert_eq!(keys.len(), diffs.len());
        }
    }
}
