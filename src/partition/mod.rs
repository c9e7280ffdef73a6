//! Per-team partitioning of change batches.
//!
//! Every batch lands in at most one partition per team. Records owned by
//! [`UNASSIGNED_TEAM`] are dropped, records without a team go to
//! [`FALLBACK_PARTITION`].

use crate::snapshot::{initial_entries, interface_team};
use crate::types::{
    ChangeBatch, ChangeRecord, LogEntry, Timestamp, FALLBACK_PARTITION, UNASSIGNED_TEAM,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Destination partition of a batch.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartitionKey {
    Team(String),
    /// Records whose team did not resolve.
    Fallback,
}

impl PartitionKey {
    /// Route a team value. Returns `None` for the unassigned sentinel.
    pub fn for_team(team: Option<&str>) -> Option<Self> {
        match team {
            Some(UNASSIGNED_TEAM) => None,
            Some(team) => Some(PartitionKey::Team(team.to_string())),
            None => Some(PartitionKey::Fallback),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PartitionKey::Team(team) => team,
            PartitionKey::Fallback => FALLBACK_PARTITION,
        }
    }

    /// Name usable as a file stem.
    pub fn file_stem(&self) -> String {
        sanitize_name(self.name())
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Replace every character outside `[A-Za-z0-9_-]` (and other Unicode
/// alphanumerics) with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Batches grouped by destination partition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Partitions {
    groups: BTreeMap<PartitionKey, Vec<ChangeBatch>>,
}

impl Partitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split the changes of one instant by team, one batch per partition.
    pub fn add_changes(&mut self, timestamp: &Timestamp, changes: &[ChangeRecord]) {
        let mut by_key: BTreeMap<PartitionKey, Vec<ChangeRecord>> = BTreeMap::new();
        for change in changes {
            if let Some(key) = PartitionKey::for_team(change.team.as_deref()) {
                by_key.entry(key).or_default().push(change.clone());
            }
        }

        for (key, changes) in by_key {
            self.groups.entry(key).or_default().push(ChangeBatch::Change {
                timestamp: timestamp.clone(),
                changes,
            });
        }
    }

    /// Route one initial-state entry by its interface's team.
    pub fn add_initial(&mut self, timestamp: &Timestamp, interface: &Value) {
        let team = interface_team(interface);
        if let Some(key) = PartitionKey::for_team(team.as_deref()) {
            self.groups.entry(key).or_default().push(ChangeBatch::Initial {
                timestamp: timestamp.clone(),
                team,
                interface_data: interface.clone(),
            });
        }
    }

    /// Route a batch that is already attributed.
    pub fn add_batch(&mut self, batch: ChangeBatch) {
        match batch {
            ChangeBatch::Initial {
                timestamp,
                interface_data,
                ..
            } => self.add_initial(&timestamp, &interface_data),
            ChangeBatch::Change { timestamp, changes } => self.add_changes(&timestamp, &changes),
        }
    }

    /// Partition global log entries in chronological order.
    ///
    /// The sort is stable, so entries sharing a timestamp keep log order.
    pub fn from_log<'a>(entries: impl IntoIterator<Item = &'a LogEntry>) -> Self {
        let mut entries: Vec<&LogEntry> = entries.into_iter().collect();
        entries.sort_by(|a, b| a.timestamp().cmp(b.timestamp()));

        let mut partitions = Self::new();
        for entry in entries {
            match entry {
                LogEntry::Initial { timestamp, state } => {
                    for batch in initial_entries(state, timestamp) {
                        partitions.add_batch(batch);
                    }
                }
                LogEntry::Change { timestamp, changes } => {
                    partitions.add_changes(timestamp, changes)
                }
            }
        }
        partitions
    }

    pub fn get(&self, key: &PartitionKey) -> Option<&[ChangeBatch]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PartitionKey, &[ChangeBatch])> {
        self.groups.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &PartitionKey> {
        self.groups.keys()
    }

    /// Number of partitions with at least one batch.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total batches across all partitions.
    pub fn batch_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Total field-level records across all partitions.
    pub fn record_count(&self) -> usize {
        self.groups
            .values()
            .flatten()
            .map(ChangeBatch::record_count)
            .sum()
    }
}

impl IntoIterator for Partitions {
    type Item = (PartitionKey, Vec<ChangeBatch>);
    type IntoIter = std::collections::btree_map::IntoIter<PartitionKey, Vec<ChangeBatch>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

/// Distinct teams named in a log, excluding the unassigned sentinel.
pub fn teams_in_log<'a>(entries: impl IntoIterator<Item = &'a LogEntry>) -> Vec<String> {
    let mut teams = std::collections::BTreeSet::new();
    for entry in entries {
        match entry {
            LogEntry::Initial { state, .. } => {
                teams.extend(crate::snapshot::interfaces(state).filter_map(interface_team));
            }
            LogEntry::Change { changes, .. } => {
                teams.extend(changes.iter().filter_map(|c| c.team.clone()));
            }
        }
    }
    teams.remove(UNASSIGNED_TEAM);
    teams.into_iter().collect()
}
