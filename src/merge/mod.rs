//! Incremental merge of the global change log into team partitions.
//!
//! The merge keeps a cursor (`last_processed_timestamp`) and only replays log
//! entries strictly newer than it. Each entry therefore reaches its
//! partitions exactly once, however often the merge runs.
//!
//! Until an operator marks the migration complete the controller is gated:
//! every call is a no-op that neither reads the log nor writes anything.

use crate::error::Result;
use crate::partition::Partitions;
use crate::records::ChangeLog;
use crate::sinks::{write_partitions, PartitionSink};
use crate::types::{LogEntry, MergeState};
use tracing::{debug, info};

/// Supplier of the full, append-only source log.
pub trait LogSource {
    fn entries(&self) -> Vec<LogEntry>;
}

impl LogSource for ChangeLog {
    fn entries(&self) -> Vec<LogEntry> {
        ChangeLog::entries(self)
    }
}

impl LogSource for [LogEntry] {
    fn entries(&self) -> Vec<LogEntry> {
        self.to_vec()
    }
}

impl LogSource for Vec<LogEntry> {
    fn entries(&self) -> Vec<LogEntry> {
        self.clone()
    }
}

/// Whether merges are allowed to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeGate {
    /// Migration not yet complete; merges are no-ops.
    Gated,
    Active,
}

impl MergeGate {
    pub fn of(state: &MergeState) -> Self {
        if state.migration_completed {
            MergeGate::Active
        } else {
            MergeGate::Gated
        }
    }
}

/// Result of one merge call.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeOutcome {
    pub gate: MergeGate,

    /// State to persist. Equal to the input state when nothing was merged.
    pub state: MergeState,

    /// Source entries newer than the cursor.
    pub entries_considered: usize,

    /// Batches appended across all partitions.
    pub batches_written: usize,

    /// Partitions that received at least one batch.
    pub partitions_written: usize,
}

impl MergeOutcome {
    fn unchanged(gate: MergeGate, state: &MergeState) -> Self {
        Self {
            gate,
            state: state.clone(),
            entries_considered: 0,
            batches_written: 0,
            partitions_written: 0,
        }
    }

    /// True when the cursor moved and the state must be persisted.
    pub fn advanced(&self) -> bool {
        self.entries_considered > 0
    }
}

/// Entries strictly newer than the cursor, in log order.
pub fn pending_entries<'a>(log: &'a [LogEntry], state: &MergeState) -> Vec<&'a LogEntry> {
    let cursor = state.last_processed_timestamp.as_ref();
    log.iter()
        .filter(|entry| entry.timestamp().is_after(cursor))
        .collect()
}

/// Replays new log entries into a partition sink.
pub struct MergeController<'a> {
    sink: &'a dyn PartitionSink,
}

impl<'a> MergeController<'a> {
    pub fn new(sink: &'a dyn PartitionSink) -> Self {
        Self { sink }
    }

    /// Merge every entry newer than the cursor of `state`.
    ///
    /// The returned state advances the cursor to the newest merged timestamp
    /// and adds the number of merged source entries (counted before
    /// unassigned records are dropped) to `total_entries_processed`.
    /// A sink failure aborts the merge; the caller must not persist any
    /// state in that case.
    pub fn merge(&self, source: &dyn LogSource, state: &MergeState) -> Result<MergeOutcome> {
        let gate = MergeGate::of(state);
        if gate == MergeGate::Gated {
            debug!("merge gated, migration not completed");
            return Ok(MergeOutcome::unchanged(gate, state));
        }

        let log = source.entries();
        let pending = pending_entries(&log, state);
        if pending.is_empty() {
            debug!(cursor = ?state.last_processed_timestamp, "no new log entries");
            return Ok(MergeOutcome::unchanged(gate, state));
        }

        let partitions = Partitions::from_log(pending.iter().copied());
        let batches_written = write_partitions(self.sink, &partitions)?;

        let newest = pending
            .iter()
            .map(|entry| entry.timestamp())
            .max()
            .cloned();
        let cursor = match (state.last_processed_timestamp.clone(), newest) {
            (Some(old), Some(new)) => Some(old.max(new)),
            (old, new) => new.or(old),
        };

        let next = MergeState {
            last_processed_timestamp: cursor,
            migration_completed: state.migration_completed,
            total_entries_processed: state.total_entries_processed + pending.len() as u64,
        };

        info!(
            entries = pending.len(),
            partitions = partitions.len(),
            batches = batches_written,
            cursor = ?next.last_processed_timestamp,
            "merged log suffix"
        );

        Ok(MergeOutcome {
            gate,
            state: next,
            entries_considered: pending.len(),
            batches_written,
            partitions_written: partitions.len(),
        })
    }
}
