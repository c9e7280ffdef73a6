//! Tracker workspace tying all components together.

use crate::config::TrackerConfig;
use crate::diff::{DiffEngine, PathClassifier};
use crate::error::{Result, TrackerError};
use crate::merge::{MergeController, MergeGate, MergeOutcome};
use crate::partition::{teams_in_log, Partitions};
use crate::records::ChangeLog;
use crate::sinks::{
    flatten_rows, time_series, write_flat_csv, write_partitions, write_time_series_csv, JsonSink,
    PartitionSink, SinkSet, SqlSink,
};
use crate::snapshot::{filter_networks, initial_entries};
use crate::state::{load_current_snapshot, MergeStateStore, SnapshotStore};
use crate::types::{LogEntry, MergeState, Timestamp};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Previous snapshot document.
pub const SNAPSHOT_FILE: &str = "team_state.json";

/// Global change log document.
pub const CHANGE_LOG_FILE: &str = "changes.json";

/// Merge cursor document.
pub const MERGE_STATE_FILE: &str = "merge_state.json";

/// Root of the per-team outputs.
pub const TEAM_DATA_DIR: &str = "team-data";

/// What a tracking run found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunKind {
    /// Current snapshot was not a map; nothing was read further or written.
    Skipped,
    /// No previous snapshot: every interface was recorded in full.
    Initial,
    /// Field-level changes were detected.
    Changed,
    /// Snapshots were equal.
    Unchanged,
}

/// Summary of one tracking run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub timestamp: Timestamp,
    pub kind: RunKind,
    /// Change records (or initial entries) produced by this run.
    pub records: usize,
    pub gate: MergeGate,
    /// Batches appended to partitions, directly or through the merge.
    pub batches_written: usize,
    pub partitions_written: usize,
}

/// Shape of a CSV export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsvLayout {
    /// One row per change record.
    Flat,
    /// One row per batch, one column per field.
    TimeSeries,
}

/// The tracker workspace.
///
/// Owns every persisted document under `data_dir`:
/// - `team_state.json`, the previous snapshot
/// - `changes.json`, the global change log
/// - `merge_state.json`, the merge cursor
/// - `team-data/{json,sql,csv}`, the per-team partitions
///
/// An advisory `LOCK` file is held for the lifetime of the value, so two
/// trackers never share a workspace.
pub struct Tracker {
    config: TrackerConfig,

    /// Lock file for exclusive access.
    _lock_file: File,

    snapshots: SnapshotStore,
    log: ChangeLog,
    merge_state: MergeStateStore,
    classifier: PathClassifier,

    /// Partition destination for runs and merges.
    sink: Box<dyn PartitionSink>,

    /// JSON partitions, read back for CSV export.
    json: JsonSink,

    /// Serializes runs and merges within the process.
    write_lock: Mutex<()>,
}

impl Tracker {
    /// Open a workspace writing to the JSON and SQL team sinks.
    pub fn open(config: TrackerConfig) -> Result<Self> {
        let team_data = config.data_dir.join(TEAM_DATA_DIR);
        let sink = SinkSet::new(vec![
            Box::new(JsonSink::new(team_data.join("json"))),
            Box::new(SqlSink::new(team_data.join("sql"), config.root_label.clone())),
        ]);
        Self::with_sink(config, Box::new(sink))
    }

    /// Open a workspace with a custom partition sink.
    pub fn with_sink(config: TrackerConfig, sink: Box<dyn PartitionSink>) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let lock_file = Self::acquire_lock(&config.data_dir)?;

        let data_dir = config.data_dir.clone();
        Ok(Self {
            snapshots: SnapshotStore::new(data_dir.join(SNAPSHOT_FILE)),
            log: ChangeLog::open(data_dir.join(CHANGE_LOG_FILE)),
            merge_state: MergeStateStore::new(data_dir.join(MERGE_STATE_FILE)),
            classifier: PathClassifier::new(config.root_label.clone()),
            json: JsonSink::new(data_dir.join(TEAM_DATA_DIR).join("json")),
            sink,
            config,
            _lock_file: lock_file,
            write_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn change_log(&self) -> &ChangeLog {
        &self.log
    }

    pub fn merge_state_store(&self) -> &MergeStateStore {
        &self.merge_state
    }

    pub fn team_data_dir(&self) -> PathBuf {
        self.config.data_dir.join(TEAM_DATA_DIR)
    }

    // --- Tracking ---

    /// Run once, stamped with the current time.
    pub fn run(&self) -> Result<RunSummary> {
        self.run_at(Timestamp::now())
    }

    /// Run once with an explicit timestamp.
    ///
    /// Order of effects: log append, partition writes, merge state, then
    /// the previous snapshot last. A failure at any step leaves the later
    /// documents untouched, so the next run sees the same previous snapshot.
    pub fn run_at(&self, timestamp: Timestamp) -> Result<RunSummary> {
        let _lock = self.write_lock.lock();

        let current = load_current_snapshot(&self.config.status_path())?;
        let state = self.merge_state.load();
        let gate = MergeGate::of(&state);

        if !current.is_object() {
            warn!(
                path = %self.config.status_path().display(),
                "current snapshot is not a map, skipping run"
            );
            return Ok(RunSummary {
                timestamp,
                kind: RunKind::Skipped,
                records: 0,
                gate,
                batches_written: 0,
                partitions_written: 0,
            });
        }

        let current = filter_networks(&current, &self.config.tracked_networks);
        let mut partitions = Partitions::new();

        let (kind, records, entry) = match self.snapshots.load() {
            None => {
                let batches = initial_entries(&current, &timestamp);
                let records = batches.len();
                for batch in batches {
                    partitions.add_batch(batch);
                }
                info!(interfaces = records, "no previous snapshot, recording initial state");
                let entry = LogEntry::Initial {
                    timestamp: timestamp.clone(),
                    state: current.clone(),
                };
                (RunKind::Initial, records, Some(entry))
            }
            Some(previous) => {
                // Both sides go through the same network filter, so a change
                // to `tracked_networks` is not reported as a diff
                let previous = filter_networks(&previous, &self.config.tracked_networks);
                let engine = DiffEngine::new(&self.config.ignored_fields, &self.classifier);
                let changes = engine.detect_changes(&previous, &current);
                if changes.is_empty() {
                    info!("no changes detected");
                    (RunKind::Unchanged, 0, None)
                } else {
                    let records = changes.len();
                    info!(changes = records, "changes detected");
                    partitions.add_changes(&timestamp, &changes);
                    let entry = LogEntry::Change {
                        timestamp: timestamp.clone(),
                        changes,
                    };
                    (RunKind::Changed, records, Some(entry))
                }
            }
        };

        if let Some(entry) = &entry {
            self.log.append(entry)?;
        }

        let (batches_written, partitions_written) = match gate {
            MergeGate::Gated => {
                let written = write_partitions(self.sink.as_ref(), &partitions)?;
                (written, partitions.len())
            }
            MergeGate::Active => {
                let outcome = self.merge_with(&state)?;
                (outcome.batches_written, outcome.partitions_written)
            }
        };

        self.snapshots.save(&current)?;

        info!(
            timestamp = %timestamp,
            kind = ?kind,
            records,
            batches = batches_written,
            partitions = partitions_written,
            "run complete"
        );

        Ok(RunSummary {
            timestamp,
            kind,
            records,
            gate,
            batches_written,
            partitions_written,
        })
    }

    // --- Merging ---

    /// Merge new log entries into the partitions.
    ///
    /// A no-op while the migration gate is closed.
    pub fn merge(&self) -> Result<MergeOutcome> {
        let _lock = self.write_lock.lock();
        let state = self.merge_state.load();
        self.merge_with(&state)
    }

    fn merge_with(&self, state: &MergeState) -> Result<MergeOutcome> {
        let outcome = MergeController::new(self.sink.as_ref()).merge(&self.log, state)?;
        if outcome.advanced() {
            self.merge_state.save(&outcome.state)?;
        }
        Ok(outcome)
    }

    /// Distinct teams present in the global log.
    pub fn teams(&self) -> Vec<String> {
        teams_in_log(self.log.entries().iter())
    }

    // --- Export ---

    /// Export every JSON partition to CSV under `team-data/csv`.
    ///
    /// Returns the written files.
    pub fn export_csv(&self, layout: CsvLayout) -> Result<Vec<PathBuf>> {
        let out_dir = self.team_data_dir().join("csv");
        fs::create_dir_all(&out_dir)?;

        let mut written = Vec::new();
        for (stem, batches) in self.json.stored()? {
            if batches.is_empty() {
                continue;
            }

            let path = match layout {
                CsvLayout::Flat => out_dir.join(format!("{}.csv", stem)),
                CsvLayout::TimeSeries => out_dir.join(format!("{}_timeseries.csv", stem)),
            };
            let writer = BufWriter::new(File::create(&path)?);

            match layout {
                CsvLayout::Flat => {
                    write_flat_csv(writer, &flatten_rows(&batches, &self.config.root_label))?
                }
                CsvLayout::TimeSeries => {
                    let series = time_series(
                        &batches,
                        &self.config.root_label,
                        &self.config.csv_excluded_columns,
                    );
                    write_time_series_csv(writer, &series)?
                }
            }

            info!(partition = %stem, path = %path.display(), "exported csv");
            written.push(path);
        }
        Ok(written)
    }

    // --- Internal ---

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_path = path.join("LOCK");
        let lock_file = File::create(lock_path)?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| TrackerError::Locked)?;

        Ok(lock_file)
    }
}
