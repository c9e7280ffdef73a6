//! Snapshot handling.
//!
//! A snapshot is an arbitrary JSON tree describing monitored state at one
//! instant. Before diffing it is normalized down to the tracked networks.

mod normalize;
mod path;

pub use normalize::{
    filter_networks, initial_entries, interface_team, interfaces, INTERFACE_KEY, NETWORKS_KEY,
    NETWORK_NAME_KEY, TEAM_KEY,
};
pub use path::{PathSegment, StructuralPath};
