//! Snapshot diffing and change attribution.

mod classify;
mod engine;

pub use classify::{
    Classification, PathClassifier, REQUIRED_VERSIONS_KEY, SERVICE_MARKER, SETTINGS_KEY,
};
pub use engine::{structural_diff, DiffEngine, Difference};
