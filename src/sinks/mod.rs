//! Partition sinks.
//!
//! A sink receives the batches of one partition at a time and appends them
//! in order. Sinks never rewrite or reorder what they already hold.

mod csv_export;
mod json;
mod sql;

pub use self::csv_export::{
    flatten_rows, time_series, write_flat_csv, write_time_series_csv, FlatRow, TimeSeries,
};
pub use self::json::JsonSink;
pub use self::sql::{insert_statement, initial_statement, sql_literal, SqlSink};

use crate::error::Result;
use crate::partition::{PartitionKey, Partitions};
use crate::types::ChangeBatch;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::info;

/// Destination for partitioned batches.
pub trait PartitionSink {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Append `batches` to the partition `key`, preserving their order.
    fn append(&self, key: &PartitionKey, batches: &[ChangeBatch]) -> Result<()>;
}

/// Fan-out to several sinks, in order. The first failure aborts.
pub struct SinkSet {
    sinks: Vec<Box<dyn PartitionSink>>,
}

impl SinkSet {
    pub fn new(sinks: Vec<Box<dyn PartitionSink>>) -> Self {
        Self { sinks }
    }
}

impl PartitionSink for SinkSet {
    fn name(&self) -> &str {
        "set"
    }

    fn append(&self, key: &PartitionKey, batches: &[ChangeBatch]) -> Result<()> {
        for sink in &self.sinks {
            sink.append(key, batches)?;
        }
        Ok(())
    }
}

/// Write every partition to `sink`. Returns the number of batches written.
pub fn write_partitions(sink: &dyn PartitionSink, partitions: &Partitions) -> Result<usize> {
    let mut written = 0;
    for (key, batches) in partitions.iter() {
        sink.append(key, batches)?;
        written += batches.len();
        info!(
            sink = sink.name(),
            partition = %key,
            batches = batches.len(),
            records = batches.iter().map(ChangeBatch::record_count).sum::<usize>(),
            "appended partition"
        );
    }
    Ok(written)
}

/// In-memory sink, used for dry runs and tests.
#[derive(Default)]
pub struct MemorySink {
    partitions: Mutex<BTreeMap<PartitionKey, Vec<ChangeBatch>>>,
    appends: Mutex<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches held for one partition.
    pub fn partition(&self, key: &PartitionKey) -> Vec<ChangeBatch> {
        self.partitions.lock().get(key).cloned().unwrap_or_default()
    }

    /// Copy of every partition.
    pub fn contents(&self) -> BTreeMap<PartitionKey, Vec<ChangeBatch>> {
        self.partitions.lock().clone()
    }

    /// Number of `append` calls received.
    pub fn append_calls(&self) -> usize {
        *self.appends.lock()
    }
}

impl PartitionSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn append(&self, key: &PartitionKey, batches: &[ChangeBatch]) -> Result<()> {
        *self.appends.lock() += 1;
        self.partitions
            .lock()
            .entry(key.clone())
            .or_default()
            .extend_from_slice(batches);
        Ok(())
    }
}
