//! Per-team SQL insert scripts.

use super::PartitionSink;
use crate::error::{Result, TrackerError};
use crate::partition::PartitionKey;
use crate::types::{ChangeBatch, ChangeRecord, Timestamp, DEFAULT_SERVICE};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const INSERT_PREFIX: &str = "INSERT INTO interface_changes \
     (timestamp, team, service, field, full_path, change_type, old_value, new_value) VALUES";

/// Quote `value` as a SQL string literal, doubling embedded single quotes.
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn optional_literal(value: Option<&str>) -> String {
    value.map(sql_literal).unwrap_or_else(|| "null".to_string())
}

fn json_literal(value: &Value) -> String {
    sql_literal(&value.to_string())
}

/// `INSERT` for one change record.
pub fn insert_statement(change: &ChangeRecord, timestamp: &Timestamp) -> String {
    format!(
        "{} ({}, {}, {}, {}, {}, {}, {}, {});\n",
        INSERT_PREFIX,
        sql_literal(timestamp.as_str()),
        optional_literal(change.team.as_deref()),
        optional_literal(change.service.as_deref()),
        sql_literal(&change.field),
        sql_literal(&change.full_path),
        sql_literal(change.change_type.as_str()),
        json_literal(&change.old_value),
        json_literal(&change.new_value),
    )
}

/// `INSERT` recording the initial state of one interface.
pub fn initial_statement(
    timestamp: &Timestamp,
    team: Option<&str>,
    interface_data: &Value,
    root_label: &str,
) -> String {
    format!(
        "{} ({}, {}, {}, 'initial_state', {}, 'initial', 'null', {});\n",
        INSERT_PREFIX,
        sql_literal(timestamp.as_str()),
        optional_literal(team),
        sql_literal(DEFAULT_SERVICE),
        sql_literal(&format!(
            "{}.operator.{}.interface",
            root_label,
            team.unwrap_or("unknown")
        )),
        json_literal(interface_data),
    )
}

/// Appends `INSERT` statements to `<dir>/<partition>.sql`.
pub struct SqlSink {
    dir: PathBuf,
    root_label: String,
}

impl SqlSink {
    pub fn new(dir: impl AsRef<Path>, root_label: impl Into<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            root_label: root_label.into(),
        }
    }

    pub fn path_for(&self, key: &PartitionKey) -> PathBuf {
        self.dir.join(format!("{}.sql", key.file_stem()))
    }

    fn render(&self, batches: &[ChangeBatch]) -> String {
        let mut script = String::new();
        for batch in batches {
            match batch {
                ChangeBatch::Initial {
                    timestamp,
                    team,
                    interface_data,
                } => script.push_str(&initial_statement(
                    timestamp,
                    team.as_deref(),
                    interface_data,
                    &self.root_label,
                )),
                ChangeBatch::Change { timestamp, changes } => {
                    for change in changes {
                        script.push_str(&insert_statement(change, timestamp));
                    }
                }
            }
        }
        script
    }
}

impl PartitionSink for SqlSink {
    fn name(&self) -> &str {
        "sql"
    }

    fn append(&self, key: &PartitionKey, batches: &[ChangeBatch]) -> Result<()> {
        let script = self.render(batches);
        if script.is_empty() {
            return Ok(());
        }

        let write = || -> std::io::Result<()> {
            fs::create_dir_all(&self.dir)?;
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.path_for(key))?;
            file.write_all(script.as_bytes())?;
            file.sync_all()
        };

        write().map_err(|e| TrackerError::Sink {
            partition: key.to_string(),
            reason: e.to_string(),
        })
    }
}
