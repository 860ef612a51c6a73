//! Per-system manifest ledger.
//!
//! A manifest is a YAML mapping holding a few header fields, an `artifacts`
//! mapping and five append-only lists. [`ManifestStore`] owns the file
//! location; callers load once, append in memory, and save once at the end of
//! an invocation so a fatal error never leaves a half-built file behind.

use crate::error::{LedgerError, Result};
use crate::gate::{GateResult, GateThresholds};
use crate::io;
use crate::paths;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::path::{Path, PathBuf};

pub const WORKFLOW_VERSION: &str = "1.0.0";

pub const MIGRATION_TOOL: &str = "migrate_manifest";

const HEADER_KEYS: &[&str] = &[
    "last_updated",
    "manifest_path",
    "repo_root",
    "system",
    "workflow_version",
];

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

// ---------------------------------------------------------------------------
// ManifestList
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestList {
    Adrs,
    WaReviews,
    Validations,
    DecisionTraces,
    Actions,
}

impl ManifestList {
    pub fn all() -> &'static [ManifestList] {
        &[
            ManifestList::Adrs,
            ManifestList::WaReviews,
            ManifestList::Validations,
            ManifestList::DecisionTraces,
            ManifestList::Actions,
        ]
    }

    pub fn key(self) -> &'static str {
        match self {
            ManifestList::Adrs => "adrs",
            ManifestList::WaReviews => "wa_reviews",
            ManifestList::Validations => "validations",
            ManifestList::DecisionTraces => "decision_traces",
            ManifestList::Actions => "actions",
        }
    }
}

impl fmt::Display for ManifestList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub path: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationEntry {
    pub timestamp: String,
    pub result: GateResult,
    pub issues: Vec<String>,
    pub gate: GateThresholds,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub path: String,
    pub timestamp: String,
    pub marker_count: usize,
    pub unmapped_count: usize,
}

/// One tool invocation recorded in the `actions` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub tool: String,
    pub timestamp: String,
    pub inputs: serde_json::Value,
    pub outputs: serde_json::Value,
    pub exit_code: i32,
    pub workflow_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrated_manifest_from: Option<String>,
}

impl ActionEntry {
    pub fn new(
        tool: impl Into<String>,
        inputs: serde_json::Value,
        outputs: serde_json::Value,
        exit_code: i32,
    ) -> Self {
        Self {
            tool: tool.into(),
            timestamp: now_rfc3339(),
            inputs,
            outputs,
            exit_code,
            workflow_version: WORKFLOW_VERSION.to_string(),
            migrated_manifest_from: None,
        }
    }

    fn migration(from: &Path, to: &Path) -> Self {
        let mut entry = Self::new(
            MIGRATION_TOOL,
            serde_json::json!({ "legacy_path": from.display().to_string() }),
            serde_json::json!({ "manifest_path": to.display().to_string() }),
            0,
        );
        entry.migrated_manifest_from = Some(from.display().to_string());
        entry
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Persisted with the keys of every mapping sorted, at every level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    actions: Vec<Value>,
    #[serde(default)]
    adrs: Vec<Value>,
    #[serde(default)]
    pub artifacts: Mapping,
    #[serde(default)]
    decision_traces: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default)]
    validations: Vec<Value>,
    #[serde(default)]
    wa_reviews: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_version: Option<String>,
    /// Keys this version does not know about, carried through untouched.
    #[serde(flatten)]
    pub extra: Mapping,
    /// `last_updated` as it was on disk when loaded.
    #[serde(skip)]
    observed_stamp: Option<String>,
    #[serde(skip)]
    migrated_from: Option<PathBuf>,
}

impl Manifest {
    pub fn entries(&self, list: ManifestList) -> &[Value] {
        match list {
            ManifestList::Adrs => &self.adrs,
            ManifestList::WaReviews => &self.wa_reviews,
            ManifestList::Validations => &self.validations,
            ManifestList::DecisionTraces => &self.decision_traces,
            ManifestList::Actions => &self.actions,
        }
    }

    fn list_mut(&mut self, list: ManifestList) -> &mut Vec<Value> {
        match list {
            ManifestList::Adrs => &mut self.adrs,
            ManifestList::WaReviews => &mut self.wa_reviews,
            ManifestList::Validations => &mut self.validations,
            ManifestList::DecisionTraces => &mut self.decision_traces,
            ManifestList::Actions => &mut self.actions,
        }
    }

    /// Push one record onto `list`. Existing entries are never touched.
    pub fn append<T: Serialize>(&mut self, list: ManifestList, entry: &T) -> Result<()> {
        let value = serde_yaml::to_value(entry)?;
        self.list_mut(list).push(value);
        Ok(())
    }

    /// Fill in the header fields every tool writes. `system` is only set when
    /// absent; the others always reflect the current invocation.
    pub fn stamp(&mut self, system: &str, repo_root: &Path, manifest_path: &Path) {
        if self.system.is_none() {
            self.system = Some(system.to_string());
        }
        self.manifest_path = Some(manifest_path.display().to_string());
        self.repo_root = Some(repo_root.display().to_string());
        self.workflow_version = Some(WORKFLOW_VERSION.to_string());
    }

    pub fn set_artifact<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_yaml::to_value(value)?;
        self.artifacts.insert(Value::String(key.to_string()), value);
        Ok(())
    }

    /// Legacy path copied forward by the load that produced this manifest.
    pub fn migrated_from(&self) -> Option<&Path> {
        self.migrated_from.as_deref()
    }

    /// Number of `actions` entries written by `tool`.
    pub fn action_count(&self, tool: &str) -> usize {
        self.actions
            .iter()
            .filter(|a| a.get("tool").and_then(Value::as_str) == Some(tool))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Coerce a parsed YAML document into a [`Manifest`].
///
/// An empty document is an empty manifest. Lists that are missing or not
/// sequences become empty, a non-mapping `artifacts` becomes empty, scalar
/// header values are rendered as strings and any other header value is
/// dropped. A top-level value that is not a mapping is rejected.
pub fn normalize(value: Value, path: &Path) -> Result<Manifest> {
    let mut map = match value {
        Value::Null => Mapping::new(),
        Value::Mapping(map) => map,
        _ => return Err(LedgerError::ManifestNotMapping(path.to_path_buf())),
    };

    for list in ManifestList::all() {
        if !matches!(map.get(list.key()), Some(Value::Sequence(_))) {
            if map.contains_key(list.key()) {
                tracing::warn!(path = %path.display(), list = list.key(), "resetting malformed manifest list");
            }
            map.insert(Value::String(list.key().to_string()), Value::Sequence(Vec::new()));
        }
    }

    if !matches!(map.get("artifacts"), Some(Value::Mapping(_))) {
        map.insert(Value::String("artifacts".to_string()), Value::Mapping(Mapping::new()));
    }

    for key in HEADER_KEYS {
        let coerced = match map.get(*key) {
            None | Some(Value::String(_)) => continue,
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(_) => None,
        };
        match coerced {
            Some(s) => {
                map.insert(Value::String((*key).to_string()), Value::String(s));
            }
            None => {
                map.remove(*key);
            }
        }
    }

    let manifest: Manifest = serde_yaml::from_value(Value::Mapping(map))?;
    Ok(manifest)
}

/// Rebuild every mapping in `value` with its keys in ascending order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut entries: Vec<(Value, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| key_text(&a.0).cmp(&key_text(&b.0)));
            Value::Mapping(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other).unwrap_or_default(),
    }
}

fn read_manifest(path: &Path) -> Result<Option<Manifest>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    if data.trim().is_empty() {
        return Ok(Some(Manifest::default()));
    }
    let value: Value = serde_yaml::from_str(&data)?;
    normalize(value, path).map(Some)
}

// ---------------------------------------------------------------------------
// ManifestLocation
// ---------------------------------------------------------------------------

/// Where a system's manifest lives now, and where older workflow versions
/// kept it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestLocation {
    pub canonical: PathBuf,
    pub legacy: PathBuf,
}

impl ManifestLocation {
    pub fn for_system(root: &Path, system: &str) -> Self {
        Self {
            canonical: paths::manifest_path(root, system),
            legacy: paths::legacy_manifest_path(root, system),
        }
    }

    /// The legacy file to carry forward, when the canonical one does not
    /// exist yet. Nothing is copied here; the next save writes the canonical
    /// file together with the migration action.
    fn pending_migration(&self) -> Option<&Path> {
        if self.canonical.exists() || !self.legacy.exists() {
            return None;
        }
        Some(&self.legacy)
    }
}

// ---------------------------------------------------------------------------
// ManifestStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ManifestStore {
    location: ManifestLocation,
}

impl ManifestStore {
    pub fn new(location: ManifestLocation) -> Self {
        Self { location }
    }

    pub fn for_system(root: &Path, system: &str) -> Self {
        Self::new(ManifestLocation::for_system(root, system))
    }

    pub fn location(&self) -> &ManifestLocation {
        &self.location
    }

    pub fn path(&self) -> &Path {
        &self.location.canonical
    }

    /// Load the manifest. A system touched for the first time gets an empty
    /// manifest. A legacy-only manifest is read from its old location and
    /// gets a migration `actions` entry; it lands at the canonical path only
    /// when [`ManifestStore::save`] succeeds, so a failed command leaves no
    /// trace of the migration on disk.
    pub fn load(&self) -> Result<Manifest> {
        if let Some(legacy) = self.location.pending_migration() {
            let mut manifest = read_manifest(legacy)?.unwrap_or_default();
            // Nothing at the canonical path yet; save must still find nothing.
            manifest.observed_stamp = None;
            let entry = ActionEntry::migration(legacy, &self.location.canonical);
            manifest.append(ManifestList::Actions, &entry)?;
            manifest.migrated_from = Some(legacy.to_path_buf());
            tracing::debug!(
                from = %legacy.display(),
                to = %self.location.canonical.display(),
                "legacy manifest pending migration"
            );
            return Ok(manifest);
        }

        let mut manifest = read_manifest(&self.location.canonical)?.unwrap_or_default();
        manifest.observed_stamp = manifest.last_updated.clone();
        Ok(manifest)
    }

    /// Stamp `last_updated` and rewrite the whole file atomically.
    ///
    /// Refuses to write when the file changed on disk since `manifest` was
    /// loaded, so a concurrent writer's entries are not silently dropped.
    pub fn save(&self, manifest: &mut Manifest) -> Result<()> {
        let path = &self.location.canonical;
        let on_disk = read_manifest(path)?.and_then(|m| m.last_updated);
        if on_disk != manifest.observed_stamp {
            return Err(LedgerError::ManifestConflict {
                path: path.clone(),
                expected: manifest.observed_stamp.clone().unwrap_or_else(|| "<none>".to_string()),
                found: on_disk.unwrap_or_else(|| "<none>".to_string()),
            });
        }

        manifest.last_updated = Some(now_rfc3339());
        let data = serde_yaml::to_string(&sort_keys(serde_yaml::to_value(&*manifest)?))?;
        io::atomic_write(path, data.as_bytes())?;
        manifest.observed_stamp = manifest.last_updated.clone();
        if let Some(from) = manifest.migrated_from() {
            tracing::info!(from = %from.display(), to = %path.display(), "migrated legacy manifest");
        }
        tracing::info!(path = %path.display(), "saved manifest");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn review(n: usize) -> ReviewEntry {
        ReviewEntry {
            path: format!("reviews/WA-REVIEW-{n}.md"),
            date: "2026-01-01".to_string(),
        }
    }

    #[test]
    fn missing_file_loads_empty_manifest() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::for_system(dir.path(), "payments");
        let manifest = store.load().unwrap();
        for list in ManifestList::all() {
            assert!(manifest.entries(*list).is_empty());
        }
        assert!(manifest.system.is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn append_preserves_call_order() {
        let mut manifest = Manifest::default();
        for n in 0..3 {
            manifest.append(ManifestList::WaReviews, &review(n)).unwrap();
        }
        let entries = manifest.entries(ManifestList::WaReviews);
        assert_eq!(entries.len(), 3);
        for (n, entry) in entries.iter().enumerate() {
            let parsed: ReviewEntry = serde_yaml::from_value(entry.clone()).unwrap();
            assert_eq!(parsed, review(n));
        }
    }

    #[test]
    fn append_does_not_alter_prior_entries() {
        let mut manifest = Manifest::default();
        manifest.append(ManifestList::Actions, &review(0)).unwrap();
        let first = manifest.entries(ManifestList::Actions)[0].clone();
        manifest.append(ManifestList::Actions, &review(1)).unwrap();
        manifest.append(ManifestList::Actions, &review(2)).unwrap();
        assert_eq!(manifest.entries(ManifestList::Actions)[0], first);
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::for_system(dir.path(), "payments");
        let mut manifest = store.load().unwrap();
        manifest.stamp("payments", dir.path(), store.path());
        manifest.append(ManifestList::WaReviews, &review(1)).unwrap();
        manifest
            .append(
                ManifestList::Actions,
                &ActionEntry::new("review", serde_json::json!({}), serde_json::json!({}), 0),
            )
            .unwrap();
        manifest.set_artifact("index", &"docs/architecture/index.md").unwrap();
        store.save(&mut manifest).unwrap();
        assert!(manifest.last_updated.is_some());

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, manifest);
        assert_eq!(reloaded.system.as_deref(), Some("payments"));
        assert_eq!(reloaded.workflow_version.as_deref(), Some(WORKFLOW_VERSION));
        for list in ManifestList::all() {
            assert_eq!(reloaded.entries(*list), manifest.entries(*list));
        }
    }

    #[test]
    fn persisted_keys_are_sorted() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::for_system(dir.path(), "payments");
        let mut manifest = store.load().unwrap();
        manifest.stamp("payments", dir.path(), store.path());
        store.save(&mut manifest).unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        let keys: Vec<&str> = text
            .lines()
            .filter(|l| !l.starts_with(' ') && !l.starts_with('-') && l.contains(':'))
            .map(|l| l.split(':').next().unwrap())
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn normalize_coerces_wrong_shapes() {
        let yaml = "system: payments\nadrs: not-a-list\nactions:\n  - tool: old\nartifacts: [1, 2]\nworkflow_version: 1.0\nowner: team-a\n";
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        let manifest = normalize(value, Path::new("m.yaml")).unwrap();
        assert!(manifest.entries(ManifestList::Adrs).is_empty());
        assert_eq!(manifest.entries(ManifestList::Actions).len(), 1);
        assert!(manifest.entries(ManifestList::Validations).is_empty());
        assert!(manifest.artifacts.is_empty());
        assert_eq!(manifest.workflow_version.as_deref(), Some("1.0"));
        assert_eq!(manifest.extra.get("owner").and_then(Value::as_str), Some("team-a"));
    }

    #[test]
    fn non_mapping_manifest_is_fatal() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::for_system(dir.path(), "payments");
        std::fs::write(store.path(), "- just\n- a list\n").unwrap();
        assert!(matches!(store.load(), Err(LedgerError::ManifestNotMapping(_))));
    }

    #[test]
    fn unparseable_manifest_is_fatal() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::for_system(dir.path(), "payments");
        std::fs::write(store.path(), "system: [unclosed\n").unwrap();
        assert!(matches!(store.load(), Err(LedgerError::Yaml(_))));
    }

    #[test]
    fn empty_file_is_empty_manifest() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::for_system(dir.path(), "payments");
        std::fs::write(store.path(), "\n").unwrap();
        let manifest = store.load().unwrap();
        assert!(manifest.entries(ManifestList::Actions).is_empty());
    }

    #[test]
    fn legacy_manifest_is_migrated_once() {
        let dir = TempDir::new().unwrap();
        let location = ManifestLocation::for_system(dir.path(), "payments");
        std::fs::create_dir_all(location.legacy.parent().unwrap()).unwrap();
        std::fs::write(
            &location.legacy,
            "system: payments\nadrs:\n  - decision_id: use-postgres\n",
        )
        .unwrap();

        let store = ManifestStore::new(location.clone());
        let mut manifest = store.load().unwrap();
        assert!(!location.canonical.exists());
        assert_eq!(manifest.system.as_deref(), Some("payments"));
        assert_eq!(manifest.entries(ManifestList::Adrs).len(), 1);
        assert_eq!(manifest.action_count(MIGRATION_TOOL), 1);
        assert_eq!(manifest.migrated_from(), Some(location.legacy.as_path()));
        let action = &manifest.entries(ManifestList::Actions)[0];
        assert_eq!(
            action.get("migrated_manifest_from").and_then(Value::as_str),
            Some(location.legacy.display().to_string().as_str())
        );

        store.save(&mut manifest).unwrap();
        assert!(location.canonical.exists());
        assert!(location.legacy.exists());
        let again = store.load().unwrap();
        assert_eq!(again.action_count(MIGRATION_TOOL), 1);
        assert_eq!(again.entries(ManifestList::Adrs).len(), 1);
        assert!(again.migrated_from().is_none());
    }

    #[test]
    fn unsaved_migration_leaves_disk_untouched() {
        let dir = TempDir::new().unwrap();
        let location = ManifestLocation::for_system(dir.path(), "payments");
        std::fs::create_dir_all(location.legacy.parent().unwrap()).unwrap();
        std::fs::write(&location.legacy, "system: payments\n").unwrap();
        let store = ManifestStore::new(location.clone());

        // A command that fails after loading never saves.
        let abandoned = store.load().unwrap();
        assert_eq!(abandoned.action_count(MIGRATION_TOOL), 1);
        drop(abandoned);
        assert!(!location.canonical.exists());

        let mut manifest = store.load().unwrap();
        store.save(&mut manifest).unwrap();
        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.action_count(MIGRATION_TOOL), 1);
    }

    #[test]
    fn nested_and_unknown_keys_are_sorted_on_save() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::for_system(dir.path(), "payments");
        std::fs::write(store.path(), "owner_team: platform\nsystem: payments\n").unwrap();
        let mut manifest = store.load().unwrap();
        manifest
            .append(
                ManifestList::Actions,
                &ActionEntry::new("trace", serde_json::json!({}), serde_json::json!({}), 0),
            )
            .unwrap();
        manifest.stamp("payments", dir.path(), store.path());
        store.save(&mut manifest).unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        let top: Vec<&str> = text
            .lines()
            .filter(|l| !l.starts_with(' ') && !l.starts_with('-') && l.contains(':'))
            .map(|l| l.split(':').next().unwrap())
            .collect();
        let mut sorted = top.clone();
        sorted.sort();
        assert_eq!(top, sorted);
        assert!(top.contains(&"owner_team"));

        let positions: Vec<usize> = ["exit_code:", "inputs:", "outputs:", "timestamp:", "tool:"]
            .iter()
            .map(|k| text.find(k).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
    }

    #[test]
    fn canonical_manifest_wins_over_legacy() {
        let dir = TempDir::new().unwrap();
        let location = ManifestLocation::for_system(dir.path(), "payments");
        std::fs::create_dir_all(location.legacy.parent().unwrap()).unwrap();
        std::fs::write(&location.legacy, "system: legacy\n").unwrap();
        std::fs::write(&location.canonical, "system: current\n").unwrap();

        let manifest = ManifestStore::new(location).load().unwrap();
        assert_eq!(manifest.system.as_deref(), Some("current"));
        assert_eq!(manifest.action_count(MIGRATION_TOOL), 0);
    }

    #[test]
    fn concurrent_write_is_detected() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::for_system(dir.path(), "payments");
        let mut first = store.load().unwrap();
        store.save(&mut first).unwrap();

        let mut a = store.load().unwrap();
        let mut b = store.load().unwrap();
        a.append(ManifestList::WaReviews, &review(1)).unwrap();
        store.save(&mut a).unwrap();
        b.append(ManifestList::WaReviews, &review(2)).unwrap();
        assert!(matches!(store.save(&mut b), Err(LedgerError::ManifestConflict { .. })));

        let on_disk = store.load().unwrap();
        assert_eq!(on_disk.entries(ManifestList::WaReviews).len(), 1);
    }

    #[test]
    fn stamp_keeps_existing_system() {
        let mut manifest = Manifest {
            system: Some("Payments".to_string()),
            ..Manifest::default()
        };
        manifest.stamp("payments", Path::new("/r"), Path::new("/r/payments.yaml"));
        assert_eq!(manifest.system.as_deref(), Some("Payments"));
        assert_eq!(manifest.repo_root.as_deref(), Some("/r"));
        assert_eq!(manifest.manifest_path.as_deref(), Some("/r/payments.yaml"));
    }
}
