//! Core types for the interface tracker.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Team value meaning "explicitly unassigned". Records carrying it are dropped.
pub const UNASSIGNED_TEAM: &str = "-";

/// Partition that receives records whose team could not be resolved.
pub const FALLBACK_PARTITION: &str = "required_versions";

/// Implicit sub-service of every interface.
pub const DEFAULT_SERVICE: &str = "interface";

/// ISO-8601 UTC timestamp.
///
/// Ordering is lexical, which matches chronological order for timestamps
/// rendered in the same format.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub String);

impl Timestamp {
    /// Current time, microsecond precision with a `Z` suffix.
    pub fn now() -> Self {
        Timestamp(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when this timestamp sorts strictly after `cursor`.
    /// An unset cursor admits everything.
    pub fn is_after(&self, cursor: Option<&Timestamp>) -> bool {
        match cursor {
            Some(cursor) => self > cursor,
            None => true,
        }
    }
}

impl From<&str> for Timestamp {
    fn from(s: &str) -> Self {
        Timestamp(s.to_string())
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of structural difference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Removed => "removed",
            ChangeType::Modified => "modified",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected difference between two snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Resolved team, `None` when the path could not be attributed.
    #[serde(default)]
    pub team: Option<String>,

    /// Resolved service (`"interface"` for the interface itself).
    #[serde(default)]
    pub service: Option<String>,

    /// Last segment of the structural path.
    #[serde(default)]
    pub field: String,

    /// Human-readable dotted path.
    #[serde(default)]
    pub full_path: String,

    #[serde(rename = "type")]
    pub change_type: ChangeType,

    #[serde(default)]
    pub old_value: Value,

    #[serde(default)]
    pub new_value: Value,
}

/// Entry of a team partition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChangeBatch {
    /// Full state of one interface, recorded on the first run.
    Initial {
        timestamp: Timestamp,
        team: Option<String>,
        interface_data: Value,
    },

    /// Changes detected for one team at one instant.
    Change {
        timestamp: Timestamp,
        changes: Vec<ChangeRecord>,
    },
}

impl ChangeBatch {
    pub fn timestamp(&self) -> &Timestamp {
        match self {
            ChangeBatch::Initial { timestamp, .. } | ChangeBatch::Change { timestamp, .. } => {
                timestamp
            }
        }
    }

    /// Number of field-level records carried (an initial entry counts as one).
    pub fn record_count(&self) -> usize {
        match self {
            ChangeBatch::Initial { .. } => 1,
            ChangeBatch::Change { changes, .. } => changes.len(),
        }
    }
}

/// Entry of the global change log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogEntry {
    /// Complete normalized state captured on an initial run.
    Initial { timestamp: Timestamp, state: Value },

    /// All changes detected in one run, across every team.
    Change {
        timestamp: Timestamp,
        changes: Vec<ChangeRecord>,
    },
}

impl LogEntry {
    pub fn timestamp(&self) -> &Timestamp {
        match self {
            LogEntry::Initial { timestamp, .. } | LogEntry::Change { timestamp, .. } => timestamp,
        }
    }

    /// Read one log element leniently.
    ///
    /// Untagged elements carrying a `changes` array are change entries.
    /// Returns `None` for anything that is neither shape; change records that
    /// fail to parse are skipped individually.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let timestamp = Timestamp(
            obj.get("timestamp")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        );

        if obj.get("type").and_then(Value::as_str) == Some("initial") {
            let state = obj
                .get("state")
                .cloned()
                .unwrap_or_else(|| Value::Object(Default::default()));
            return Some(LogEntry::Initial { timestamp, state });
        }

        let changes = obj.get("changes")?.as_array()?;
        let changes = changes
            .iter()
            .filter_map(|c| match serde_json::from_value::<ChangeRecord>(c.clone()) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(%timestamp, error = %e, "skipping malformed change record");
                    None
                }
            })
            .collect();

        Some(LogEntry::Change { timestamp, changes })
    }
}

/// Persisted cursor of the incremental merge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeState {
    #[serde(default)]
    pub last_processed_timestamp: Option<Timestamp>,

    /// Operator-set gate; merges are no-ops until this is true.
    #[serde(default)]
    pub migration_completed: bool,

    /// Source log entries considered across all merges.
    #[serde(default)]
    pub total_entries_processed: u64,
}
