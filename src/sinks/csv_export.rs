//! CSV export of team partitions.
//!
//! Two shapes are supported. The flat shape writes one row per change record
//! (and one per initial entry). The time-series shape replays every change
//! onto the interface's initial state and writes one row per batch, one
//! column per field.

use crate::diff::{SERVICE_MARKER, SETTINGS_KEY};
use crate::error::Result;
use crate::types::{ChangeBatch, ChangeType, Timestamp, DEFAULT_SERVICE};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

/// One row of the flat export.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlatRow {
    pub timestamp: String,
    pub entry_type: String,
    pub team: String,
    pub service: String,
    pub field: String,
    pub full_path: String,
    pub change_type: String,
    pub old_value: String,
    pub new_value: String,
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flatten a partition into one row per record.
pub fn flatten_rows(batches: &[ChangeBatch], root_label: &str) -> Vec<FlatRow> {
    let mut rows = Vec::new();
    for batch in batches {
        match batch {
            ChangeBatch::Initial {
                timestamp,
                team,
                interface_data,
            } => {
                rows.push(FlatRow {
                    timestamp: timestamp.to_string(),
                    entry_type: "initial".into(),
                    full_path: format!(
                        "{}.operator.{}.interface",
                        root_label,
                        team.as_deref().unwrap_or("unknown")
                    ),
                    team: team.clone().unwrap_or_default(),
                    service: DEFAULT_SERVICE.into(),
                    field: "initial_state".into(),
                    change_type: "initial".into(),
                    old_value: String::new(),
                    new_value: interface_data.to_string(),
                });
            }
            ChangeBatch::Change { timestamp, changes } => {
                rows.extend(changes.iter().map(|change| FlatRow {
                    timestamp: timestamp.to_string(),
                    entry_type: "change".into(),
                    team: change.team.clone().unwrap_or_default(),
                    service: change.service.clone().unwrap_or_default(),
                    field: change.field.clone(),
                    full_path: change.full_path.clone(),
                    change_type: change.change_type.to_string(),
                    old_value: render(&change.old_value),
                    new_value: render(&change.new_value),
                }));
            }
        }
    }
    rows
}

/// Write flat rows with a header line.
pub fn write_flat_csv<W: Write>(writer: W, rows: &[FlatRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Field-level history of one partition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSeries {
    /// Column names, sorted, exclusions removed.
    pub columns: Vec<String>,
    /// One row per batch: timestamp plus the value of every column.
    pub rows: Vec<(Timestamp, BTreeMap<String, String>)>,
}

/// Columns of an interface's initial state.
///
/// Top-level interface fields become `interface.<key>`; fields of each
/// settings entry become `service.<name>.<key>`.
fn flatten_interface(interface: &Value) -> BTreeMap<String, String> {
    let mut columns = BTreeMap::new();
    let Some(obj) = interface.as_object() else {
        return columns;
    };

    for (key, value) in obj {
        if key == SETTINGS_KEY {
            if let Some(settings) = value.as_array() {
                for entry in settings {
                    let (Some(entry), Some(service)) = (
                        entry.as_object(),
                        entry.get(SERVICE_MARKER).and_then(Value::as_str),
                    ) else {
                        continue;
                    };
                    for (field, value) in entry {
                        columns.insert(format!("service.{}.{}", service, field), render(value));
                    }
                }
                continue;
            }
        }
        columns.insert(format!("{}.{}", DEFAULT_SERVICE, key), render(value));
    }
    columns
}

/// Column touched by a change: its readable path without the
/// `<root>.operator.<team>.` prefix. Unattributed paths are used whole.
fn column_for(full_path: &str, team: Option<&str>, root_label: &str) -> String {
    if let Some(team) = team {
        let prefix = format!("{}.operator.{}.", root_label, team);
        if let Some(rest) = full_path.strip_prefix(&prefix) {
            return rest.to_string();
        }
    }
    full_path.to_string()
}

/// Replay a partition into a field-level time series.
///
/// Columns whose name contains any of `excluded` are dropped.
pub fn time_series(batches: &[ChangeBatch], root_label: &str, excluded: &[String]) -> TimeSeries {
    let mut current: BTreeMap<String, String> = BTreeMap::new();
    let mut rows = Vec::with_capacity(batches.len());
    let mut seen: BTreeSet<String> = BTreeSet::new();

    for batch in batches {
        match batch {
            ChangeBatch::Initial { interface_data, .. } => {
                current = flatten_interface(interface_data);
            }
            ChangeBatch::Change { changes, .. } => {
                for change in changes {
                    let column =
                        column_for(&change.full_path, change.team.as_deref(), root_label);
                    match change.change_type {
                        ChangeType::Removed => {
                            current.insert(column, String::new());
                        }
                        ChangeType::Added | ChangeType::Modified => {
                            current.insert(column, render(&change.new_value));
                        }
                    }
                }
            }
        }

        current.retain(|column, _| {
            !excluded
                .iter()
                .any(|pattern| column.contains(pattern.as_str()))
        });
        seen.extend(current.keys().cloned());
        rows.push((batch.timestamp().clone(), current.clone()));
    }

    TimeSeries {
        columns: seen.into_iter().collect(),
        rows,
    }
}

/// Write a time series: `timestamp` followed by every column.
pub fn write_time_series_csv<W: Write>(writer: W, series: &TimeSeries) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["timestamp".to_string()];
    header.extend(series.columns.iter().cloned());
    wtr.write_record(&header)?;

    for (timestamp, values) in &series.rows {
        let mut record = vec![timestamp.to_string()];
        record.extend(
            series
                .columns
                .iter()
                .map(|c| values.get(c).cloned().unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
