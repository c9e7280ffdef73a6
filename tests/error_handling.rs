//! Error handling and edge case tests.

use interface_tracker::{
    ChangeBatch, ChangeLog, JsonSink, MergeGate, MergeState, PartitionKey, PartitionSink,
    RunKind, Timestamp, Tracker, TrackerConfig, TrackerError,
};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn test_tracker(dir: &TempDir) -> Tracker {
    Tracker::open(TrackerConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    })
    .unwrap()
}

fn write(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

fn status() -> String {
    json!({
        "networks": [{"network": "namada", "interface": [{"team": "alpha", "moniker": "a"}]}]
    })
    .to_string()
}

// --- Missing Input ---

#[test]
fn test_missing_status_file() {
    let dir = TempDir::new().unwrap();
    let tracker = test_tracker(&dir);

    let result = tracker.run();
    assert!(matches!(result, Err(TrackerError::MissingInput { .. })));
    assert!(!dir.path().join("team_state.json").exists());
    assert!(!dir.path().join("changes.json").exists());
    assert!(!dir.path().join("team-data").exists());
}

#[test]
fn test_unparsable_status_file() {
    let dir = TempDir::new().unwrap();
    write(&dir, "interface-status.json", "{\"networks\": [");
    let tracker = test_tracker(&dir);

    match tracker.run() {
        Err(TrackerError::MissingInput { path, .. }) => {
            assert!(path.ends_with("interface-status.json"))
        }
        other => panic!("expected MissingInput, got {:?}", other.map(|s| s.kind)),
    }
    assert!(!dir.path().join("team_state.json").exists());
}

// --- Malformed Input Degrades ---

#[test]
fn test_non_map_status_is_noop() {
    let dir = TempDir::new().unwrap();
    write(&dir, "interface-status.json", "[1, 2, 3]");
    let tracker = test_tracker(&dir);

    let summary = tracker.run().unwrap();
    assert_eq!(summary.kind, RunKind::Skipped);
    assert!(!dir.path().join("team_state.json").exists());
    assert!(!dir.path().join("changes.json").exists());
}

#[test]
fn test_malformed_previous_snapshot_restarts() {
    let dir = TempDir::new().unwrap();
    write(&dir, "interface-status.json", &status());
    write(&dir, "team_state.json", "not json at all");
    let tracker = test_tracker(&dir);

    let summary = tracker.run().unwrap();
    assert_eq!(summary.kind, RunKind::Initial);
}

#[test]
fn test_empty_previous_snapshot_restarts() {
    let dir = TempDir::new().unwrap();
    write(&dir, "interface-status.json", &status());
    write(&dir, "team_state.json", "{}");
    let tracker = test_tracker(&dir);

    assert_eq!(tracker.run().unwrap().kind, RunKind::Initial);
}

#[test]
fn test_non_array_networks_normalize_to_empty() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "interface-status.json",
        &json!({"networks": {"namada": {}}}).to_string(),
    );
    let tracker = test_tracker(&dir);

    let summary = tracker.run().unwrap();
    assert_eq!(summary.kind, RunKind::Initial);
    assert_eq!(summary.records, 0);
    assert_eq!(summary.partitions_written, 0);
}

#[test]
fn test_malformed_merge_state_is_gated() {
    let dir = TempDir::new().unwrap();
    write(&dir, "merge_state.json", "{\"migration_completed\": \"yes\"");
    let tracker = test_tracker(&dir);

    let outcome = tracker.merge().unwrap();
    assert_eq!(outcome.gate, MergeGate::Gated);
    assert_eq!(outcome.state, MergeState::default());
}

#[test]
fn test_non_array_change_log_is_not_overwritten() {
    let dir = TempDir::new().unwrap();
    write(&dir, "changes.json", "{\"oops\": true}");
    let log = ChangeLog::open(dir.path().join("changes.json"));
    assert!(log.entries().is_empty());

    write(&dir, "interface-status.json", &status());
    let tracker = test_tracker(&dir);
    assert!(matches!(
        tracker.run_at(Timestamp::from("t1")),
        Err(TrackerError::Deserialization(_))
    ));
    assert_eq!(
        fs::read_to_string(dir.path().join("changes.json")).unwrap(),
        "{\"oops\": true}"
    );
    assert!(!dir.path().join("team_state.json").exists());
}

#[test]
fn test_truncated_change_log_is_not_overwritten() {
    let dir = TempDir::new().unwrap();
    write(&dir, "interface-status.json", &status());
    {
        let tracker = test_tracker(&dir);
        tracker.run_at(Timestamp::from("t1")).unwrap();
        write(
            &dir,
            "interface-status.json",
            &json!({
                "networks": [{"network": "namada", "interface": [{"team": "alpha", "moniker": "b"}]}]
            })
            .to_string(),
        );
        tracker.run_at(Timestamp::from("t2")).unwrap();
        assert_eq!(tracker.change_log().entries().len(), 2);
    }

    // Cut the closing bracket, as a crash mid-write would
    let path = dir.path().join("changes.json");
    let full = fs::read_to_string(&path).unwrap();
    let truncated = full.trim_end().trim_end_matches(']').to_string();
    fs::write(&path, &truncated).unwrap();
    let snapshot = fs::read_to_string(dir.path().join("team_state.json")).unwrap();

    write(
        &dir,
        "interface-status.json",
        &json!({
            "networks": [{"network": "namada", "interface": [{"team": "alpha", "moniker": "c"}]}]
        })
        .to_string(),
    );
    let tracker = test_tracker(&dir);
    assert!(tracker.run_at(Timestamp::from("t3")).is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), truncated);
    assert_eq!(
        fs::read_to_string(dir.path().join("team_state.json")).unwrap(),
        snapshot
    );
}

#[test]
fn test_unreadable_log_elements_are_kept() {
    let dir = TempDir::new().unwrap();
    write(&dir, "changes.json", "[42, {\"timestamp\": \"t0\"}]");
    let log = ChangeLog::open(dir.path().join("changes.json"));
    assert!(log.entries().is_empty());

    write(&dir, "interface-status.json", &status());
    let tracker = test_tracker(&dir);
    tracker.run_at(Timestamp::from("t1")).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("changes.json")).unwrap())
            .unwrap();
    assert_eq!(raw.as_array().unwrap().len(), 3);
    assert_eq!(raw[0], json!(42));
    assert_eq!(tracker.change_log().entries().len(), 1);
}

#[test]
fn test_non_array_partition_is_replaced() {
    let dir = TempDir::new().unwrap();
    let sink = JsonSink::new(dir.path());
    let key = PartitionKey::Team("alpha".into());
    fs::write(sink.path_for(&key), "{\"not\": \"a list\"}").unwrap();

    sink.append(
        &key,
        &[ChangeBatch::Change {
            timestamp: Timestamp::from("t1"),
            changes: vec![],
        }],
    )
    .unwrap();
    assert_eq!(sink.read(&key).len(), 1);
}

// --- Workspace ---

#[test]
fn test_workspace_lock() {
    let dir = TempDir::new().unwrap();
    let _held = test_tracker(&dir);

    let second = Tracker::open(TrackerConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    });
    assert!(matches!(second, Err(TrackerError::Locked)));
}

#[test]
fn test_lock_released_on_drop() {
    let dir = TempDir::new().unwrap();
    drop(test_tracker(&dir));
    let _again = test_tracker(&dir);
}

#[test]
fn test_invalid_config() {
    assert!(matches!(
        TrackerConfig::from_toml("tracked_networks = \"namada\""),
        Err(TrackerError::Config(_))
    ));
    assert!(matches!(
        TrackerConfig::from_toml("root_label = \"\""),
        Err(TrackerError::Config(_))
    ));

    let dir = TempDir::new().unwrap();
    assert!(matches!(
        TrackerConfig::load(dir.path().join("absent.toml")),
        Err(TrackerError::Config(_))
    ));
}

#[test]
fn test_sink_failure_aborts_before_snapshot() {
    let dir = TempDir::new().unwrap();
    write(&dir, "interface-status.json", &status());
    // A file where the sink expects a directory
    fs::create_dir_all(dir.path().join("team-data")).unwrap();
    fs::write(dir.path().join("team-data").join("json"), "blocker").unwrap();
    let tracker = test_tracker(&dir);

    assert!(matches!(tracker.run(), Err(TrackerError::Sink { .. })));
    assert!(!dir.path().join("team_state.json").exists());
    assert!(!dir.path().join("merge_state.json").exists());
}

#[test]
fn test_empty_diff_is_normal() {
    let dir = TempDir::new().unwrap();
    write(&dir, "interface-status.json", &status());
    let tracker = test_tracker(&dir);

    tracker.run_at(Timestamp::from("t1")).unwrap();
    let summary = tracker.run_at(Timestamp::from("t2")).unwrap();
    assert_eq!(summary.kind, RunKind::Unchanged);
    assert_eq!(summary.records, 0);
}
