//! Attribution of structural paths to teams and services.
//!
//! Resolution runs in two tiers. Paths that spell out their owner
//! (`... team <name> ... service <name> ...`) are read literally. Paths that
//! only carry positions (`networks.0.interface.3.settings.1.version`) are
//! resolved by looking the interface and settings entries up in the current
//! snapshot.

use crate::snapshot::{PathSegment, StructuralPath, INTERFACE_KEY, TEAM_KEY};
use crate::types::{ChangeRecord, ChangeType, DEFAULT_SERVICE};
use serde_json::Value;

/// Root namespace holding global version requirements.
pub const REQUIRED_VERSIONS_KEY: &str = "required_versions";

/// Marker preceding a literal service name.
pub const SERVICE_MARKER: &str = "service";

/// Key of the per-interface sub-service list.
pub const SETTINGS_KEY: &str = "settings";

/// Result of classifying one path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    pub team: Option<String>,
    pub service: Option<String>,
    pub field: String,
}

impl Classification {
    fn unattributed(field: String) -> Self {
        Self {
            team: None,
            service: None,
            field,
        }
    }
}

/// Maps structural paths to `(team, service, field)` and readable paths.
#[derive(Clone, Debug)]
pub struct PathClassifier {
    root_label: String,
}

impl PathClassifier {
    pub fn new(root_label: impl Into<String>) -> Self {
        Self {
            root_label: root_label.into(),
        }
    }

    /// Classify `path` against the current snapshot. Never fails.
    pub fn classify(&self, path: &StructuralPath, snapshot: &Value) -> Classification {
        let field = path.last().map(ToString::to_string).unwrap_or_default();

        if path.first().is_some_and(|s| s.is_key(REQUIRED_VERSIONS_KEY)) {
            return Classification {
                team: None,
                service: path.segments().get(1).map(ToString::to_string),
                field,
            };
        }

        if let Some((team, service)) = literal_owner(path) {
            return Classification {
                team: Some(team),
                service,
                field,
            };
        }

        match positional_owner(path, snapshot) {
            Some((team, service)) => Classification {
                team: Some(team),
                service,
                field,
            },
            None => Classification::unattributed(field),
        }
    }

    /// Human-readable dotted path for a classified record.
    pub fn readable_path(&self, path: &StructuralPath, class: &Classification) -> String {
        let is_root_namespace = path.first().is_some_and(|s| s.is_key(REQUIRED_VERSIONS_KEY));
        let team = match &class.team {
            Some(team) if !is_root_namespace => team,
            _ => return path.dotted(),
        };

        match class.service.as_deref() {
            Some(DEFAULT_SERVICE) => format!(
                "{}.operator.{}.interface.{}",
                self.root_label, team, class.field
            ),
            Some(service) => format!(
                "{}.operator.{}.service.{}.{}",
                self.root_label, team, service, class.field
            ),
            None => format!("{}.operator.{}.{}", self.root_label, team, path.dotted()),
        }
    }

    /// Build an attributed change record.
    pub fn record(
        &self,
        path: &StructuralPath,
        change_type: ChangeType,
        old_value: Value,
        new_value: Value,
        snapshot: &Value,
    ) -> ChangeRecord {
        let class = self.classify(path, snapshot);
        let full_path = self.readable_path(path, &class);

        ChangeRecord {
            team: class.team,
            service: class.service,
            field: class.field,
            full_path,
            change_type,
            old_value,
            new_value,
        }
    }
}

/// Owner spelled out in the path text: `team <name>` and optionally
/// `service <name>` at or after it.
fn literal_owner(path: &StructuralPath) -> Option<(String, Option<String>)> {
    let segments = path.segments();
    let marker = path.position_of(TEAM_KEY, 0)?;
    let team = segments.get(marker + 1)?.to_string();

    let service = match path.position_of(SERVICE_MARKER, marker) {
        Some(pos) => segments.get(pos + 1).map(ToString::to_string),
        None => Some(DEFAULT_SERVICE.to_string()),
    };

    Some((team, service))
}

/// Owner recovered by position: `interface <i>` names an interface entry in
/// the snapshot, `settings <j>` after it names one of its sub-services.
fn positional_owner(path: &StructuralPath, snapshot: &Value) -> Option<(String, Option<String>)> {
    let segments = path.segments();
    let marker = segments.windows(2).position(|pair| {
        pair[0].is_key(INTERFACE_KEY) && matches!(pair[1], PathSegment::Index(_))
    })?;

    let interface = path.resolve_prefix(snapshot, marker + 2)?;
    let team = interface.get(TEAM_KEY)?.as_str()?.to_string();

    let service = match path.position_of(SETTINGS_KEY, marker + 2) {
        Some(pos) => match segments.get(pos + 1).and_then(PathSegment::as_index) {
            Some(index) => {
                let entry = interface.get(SETTINGS_KEY)?.as_array()?.get(index)?;
                Some(entry.get(SERVICE_MARKER)?.as_str()?.to_string())
            }
            None => None,
        },
        None => Some(DEFAULT_SERVICE.to_string()),
    };

    Some((team, service))
}
