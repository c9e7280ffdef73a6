//! Snapshot normalization.

use crate::types::{ChangeBatch, Timestamp};
use serde_json::Value;
use tracing::warn;

/// Key of the network list at the snapshot root.
pub const NETWORKS_KEY: &str = "networks";

/// Key naming a network inside each network entry.
pub const NETWORK_NAME_KEY: &str = "network";

/// Key of the interface list inside each network.
pub const INTERFACE_KEY: &str = "interface";

/// Key naming the owning team inside each interface.
pub const TEAM_KEY: &str = "team";

/// Keep only the tracked networks of a raw status tree.
///
/// Trees without a `networks` key pass through unchanged. A `networks` value
/// that is not a sequence is malformed and normalizes to an empty sequence.
pub fn filter_networks(state: &Value, tracked: &[String]) -> Value {
    let mut state = state.clone();
    let Some(obj) = state.as_object_mut() else {
        return state;
    };
    let Some(networks) = obj.get_mut(NETWORKS_KEY) else {
        return state;
    };

    let filtered: Vec<Value> = match networks.as_array() {
        Some(list) => list
            .iter()
            .filter(|n| {
                n.get(NETWORK_NAME_KEY)
                    .and_then(Value::as_str)
                    .is_some_and(|name| tracked.iter().any(|t| t == name))
            })
            .cloned()
            .collect(),
        None => {
            warn!("`networks` is not a sequence, treating as empty");
            Vec::new()
        }
    };

    *networks = Value::Array(filtered);
    state
}

/// Interfaces of every network in a normalized tree, in document order.
pub fn interfaces(state: &Value) -> impl Iterator<Item = &Value> {
    state
        .get(NETWORKS_KEY)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|network| network.get(INTERFACE_KEY).and_then(Value::as_array))
        .flatten()
}

/// Team named by an interface, if it names one.
pub fn interface_team(interface: &Value) -> Option<String> {
    interface
        .get(TEAM_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// One `initial` batch per interface of `state`.
pub fn initial_entries(state: &Value, timestamp: &Timestamp) -> Vec<ChangeBatch> {
    interfaces(state)
        .map(|interface| ChangeBatch::Initial {
            timestamp: timestamp.clone(),
            team: interface_team(interface),
            interface_data: interface.clone(),
        })
        .collect()
}
