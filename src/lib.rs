//! # Interface Tracker
//!
//! Records how a periodically refreshed status snapshot of network
//! interfaces changes over time, and files each change under the team that
//! owns it.
//!
//! ## Core Concepts
//!
//! - **Diff**: Structural comparison of two JSON snapshots into leaf changes
//! - **Classification**: Each change is attributed to a team and service
//! - **Global log**: Append-only list of every change batch ever detected
//! - **Partitions**: Per-team histories in JSON, SQL and CSV form
//! - **Merge**: Cursor-driven, idempotent replay of the log into partitions
//!
//! ## Example
//!
//! ```ignore
//! use interface_tracker::{Tracker, TrackerConfig};
//!
//! let tracker = Tracker::open(TrackerConfig {
//!     data_dir: "./tracker-data".into(),
//!     ..Default::default()
//! })?;
//!
//! // Diff the current snapshot against the last one
//! let summary = tracker.run()?;
//!
//! // Replay anything new in the global log
//! tracker.merge()?;
//! ```

pub mod config;
pub mod diff;
pub mod error;
pub mod logging;
pub mod merge;
pub mod partition;
pub mod records;
pub mod sinks;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod types;

// Re-exports
pub use config::TrackerConfig;
pub use diff::{structural_diff, Classification, DiffEngine, Difference, PathClassifier};
pub use error::{Result, TrackerError};
pub use merge::{pending_entries, LogSource, MergeController, MergeGate, MergeOutcome};
pub use partition::{sanitize_name, teams_in_log, PartitionKey, Partitions};
pub use records::ChangeLog;
pub use sinks::{JsonSink, MemorySink, PartitionSink, SinkSet, SqlSink};
pub use snapshot::{PathSegment, StructuralPath};
pub use state::{MergeStateStore, SnapshotStore};
pub use store::{CsvLayout, RunKind, RunSummary, Tracker};
pub use types::*;
