//! Recursive structural diff over snapshot trees.

use super::classify::PathClassifier;
use crate::snapshot::StructuralPath;
use crate::types::{ChangeRecord, ChangeType};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// One unattributed difference between two trees.
#[derive(Clone, Debug, PartialEq)]
pub struct Difference {
    pub path: StructuralPath,
    pub change_type: ChangeType,
    pub old_value: Value,
    pub new_value: Value,
}

/// Compare two trees and list every difference outside `ignored`.
///
/// Maps are compared by key, sequences by position, anything else by value.
/// Records are only emitted where values actually differ; a changed leaf
/// deep inside a map produces one record at the leaf and none for its
/// ancestors. A reordered sequence shows up as per-index modifications.
pub fn structural_diff(old: &Value, new: &Value, ignored: &BTreeSet<String>) -> Vec<Difference> {
    let mut out = Vec::new();
    diff_node(old, new, &StructuralPath::root(), ignored, &mut out);
    out
}

fn diff_node(
    old: &Value,
    new: &Value,
    path: &StructuralPath,
    ignored: &BTreeSet<String>,
    out: &mut Vec<Difference>,
) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            diff_maps(old_map, new_map, path, ignored, out)
        }
        (Value::Array(old_list), Value::Array(new_list)) => {
            diff_sequences(old_list, new_list, path, ignored, out)
        }
        _ if old != new => out.push(Difference {
            path: path.clone(),
            change_type: ChangeType::Modified,
            old_value: old.clone(),
            new_value: new.clone(),
        }),
        _ => {}
    }
}

fn diff_maps(
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    path: &StructuralPath,
    ignored: &BTreeSet<String>,
    out: &mut Vec<Difference>,
) {
    for (key, value) in new {
        if !old.contains_key(key) && !ignored.contains(key) {
            out.push(Difference {
                path: path.key(key),
                change_type: ChangeType::Added,
                old_value: Value::Null,
                new_value: value.clone(),
            });
        }
    }

    for (key, value) in old {
        if !new.contains_key(key) && !ignored.contains(key) {
            out.push(Difference {
                path: path.key(key),
                change_type: ChangeType::Removed,
                old_value: value.clone(),
                new_value: Value::Null,
            });
        }
    }

    for (key, old_value) in old {
        if ignored.contains(key) {
            continue;
        }
        if let Some(new_value) = new.get(key) {
            if old_value != new_value {
                diff_node(old_value, new_value, &path.key(key), ignored, out);
            }
        }
    }
}

fn diff_sequences(
    old: &[Value],
    new: &[Value],
    path: &StructuralPath,
    ignored: &BTreeSet<String>,
    out: &mut Vec<Difference>,
) {
    let shared = old.len().min(new.len());

    for (i, (old_item, new_item)) in old.iter().zip(new).enumerate() {
        diff_node(old_item, new_item, &path.index(i), ignored, out);
    }

    for (i, value) in new.iter().enumerate().skip(shared) {
        out.push(Difference {
            path: path.index(i),
            change_type: ChangeType::Added,
            old_value: Value::Null,
            new_value: value.clone(),
        });
    }

    for (i, value) in old.iter().enumerate().skip(shared) {
        out.push(Difference {
            path: path.index(i),
            change_type: ChangeType::Removed,
            old_value: value.clone(),
            new_value: Value::Null,
        });
    }
}

/// Structural diff plus attribution.
pub struct DiffEngine<'a> {
    ignored: &'a BTreeSet<String>,
    classifier: &'a PathClassifier,
}

impl<'a> DiffEngine<'a> {
    pub fn new(ignored: &'a BTreeSet<String>, classifier: &'a PathClassifier) -> Self {
        Self {
            ignored,
            classifier,
        }
    }

    /// Diff two normalized snapshots into attributed change records.
    ///
    /// Positional lookups during attribution go against `new`.
    pub fn detect_changes(&self, old: &Value, new: &Value) -> Vec<ChangeRecord> {
        structural_diff(old, new, self.ignored)
            .into_iter()
            .map(|d| {
                self.classifier
                    .record(&d.path, d.change_type, d.old_value, d.new_value, new)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_ignores() -> BTreeSet<String> {
        BTreeSet::new()
    }

    #[test]
    fn test_equal_trees_have_no_differences() {
        let tree = json!({"a": [1, {"b": null}], "c": "x"});
        assert!(structural_diff(&tree, &tree.clone(), &no_ignores()).is_empty());
    }

    #[test]
    fn test_nested_leaf_modification() {
        let old = json!({"a": 1, "b": {"c": 2}});
        let new = json!({"a": 1, "b": {"c": 3}});
        let diffs = structural_diff(&old, &new, &no_ignores());

        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].path.dotted(), "b.c");
        assert_eq!(diffs[0].change_type, ChangeType::Modified);
        assert_eq!(diffs[0].old_value, json!(2));
        assert_eq!(diffs[0].new_value, json!(3));
    }

    #[test]
    fn test_sequence_append() {
        let diffs = structural_diff(&json!([1, 2]), &json!([1, 2, 3]), &no_ignores());

        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].path.dotted(), "2");
        assert_eq!(diffs[0].change_type, ChangeType::Added);
        assert_eq!(diffs[0].old_value, Value::Null);
        assert_eq!(diffs[0].new_value, json!(3));
    }

    #[test]
    fn test_sequence_truncation() {
        let diffs = structural_diff(&json!(["a", "b", "c"]), &json!(["a"]), &no_ignores());
        let paths: Vec<String> = diffs.iter().map(|d| d.path.dotted()).collect();

        assert_eq!(paths, vec!["1", "2"]);
        assert!(diffs.iter().all(|d| d.change_type == ChangeType::Removed));
    }

    #[test]
    fn test_reorder_is_positional() {
        let diffs = structural_diff(&json!([1, 2]), &json!([2, 1]), &no_ignores());
        assert_eq!(diffs.len(), 2);
        assert!(diffs.iter().all(|d| d.change_type == ChangeType::Modified));
    }

    #[test]
    fn test_key_added_and_removed_order() {
        let old = json!({"keep": 1, "gone": true});
        let new = json!({"keep": 2, "fresh": [1]});
        let diffs = structural_diff(&old, &new, &no_ignores());
        let kinds: Vec<(String, ChangeType)> = diffs
            .iter()
            .map(|d| (d.path.dotted(), d.change_type))
            .collect();

        assert_eq!(
            kinds,
            vec![
                ("fresh".to_string(), ChangeType::Added),
                ("gone".to_string(), ChangeType::Removed),
                ("keep".to_string(), ChangeType::Modified),
            ]
        );
    }

    #[test]
    fn test_type_mismatch_is_leaf_modification() {
        let diffs = structural_diff(
            &json!({"x": null}),
            &json!({"x": {"y": 1}}),
            &no_ignores(),
        );
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].path.dotted(), "x");
        assert_eq!(diffs[0].change_type, ChangeType::Modified);
        assert_eq!(diffs[0].new_value, json!({"y": 1}));
    }

    #[test]
    fn test_empty_container_against_populated() {
        let diffs = structural_diff(&json!({}), &json!({"a": 1, "b": 2}), &no_ignores());
        assert_eq!(diffs.len(), 2);
        assert!(diffs.iter().all(|d| d.change_type == ChangeType::Added));
    }

    #[test]
    fn test_ignored_fields_at_any_depth() {
        let ignored: BTreeSet<String> = ["latest_block_height".to_string()].into();
        let old = json!({"latest_block_height": 1, "n": [{"latest_block_height": 5, "v": 1}]});
        let new = json!({"latest_block_height": 2, "n": [{"latest_block_height": 9, "v": 2}]});
        let diffs = structural_diff(&old, &new, &ignored);

        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].path.dotted(), "n.0.v");

        let added = structural_diff(&json!({}), &json!({"latest_block_height": 3}), &ignored);
        assert!(added.is_empty());
    }

    #[test]
    fn test_detect_changes_attributes_records() {
        let ignored = no_ignores();
        let classifier = PathClassifier::new("namada");
        let engine = DiffEngine::new(&ignored, &classifier);

        let old = json!({"networks": [{"interface": [{"team": "alpha", "moniker": "a"}]}]});
        let new = json!({"networks": [{"interface": [{"team": "alpha", "moniker": "b"}]}]});
        let changes = engine.detect_changes(&old, &new);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].team.as_deref(), Some("alpha"));
        assert_eq!(changes[0].full_path, "namada.operator.alpha.interface.moniker");
    }

    #[test]
    fn test_removed_trailing_service_falls_back() {
        use crate::partition::{PartitionKey, Partitions};
        use crate::types::Timestamp;

        let ignored = no_ignores();
        let classifier = PathClassifier::new("namada");
        let engine = DiffEngine::new(&ignored, &classifier);

        let old = json!({"networks": [{"interface": [{"team": "alpha", "settings": [
            {"service": "rpc", "url": "https://rpc"},
            {"service": "indexer", "url": "https://idx"}
        ]}]}]});
        let new = json!({"networks": [{"interface": [{"team": "alpha", "settings": [
            {"service": "rpc", "url": "https://rpc"}
        ]}]}]});
        let changes = engine.detect_changes(&old, &new);

        // The removed index no longer resolves in the new snapshot
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::Removed);
        assert_eq!(changes[0].team, None);
        assert_eq!(changes[0].service, None);
        assert_eq!(changes[0].full_path, "networks.0.interface.0.settings.1");

        let mut partitions = Partitions::new();
        partitions.add_changes(&Timestamp::from("t1"), &changes);
        assert!(partitions.get(&PartitionKey::Fallback).is_some());
        assert!(partitions.get(&PartitionKey::Team("alpha".into())).is_none());
    }
}
