use crate::error::Result;
use crate::paths::ADR_PREFIX;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static DECISION_ID_RE: OnceLock<Regex> = OnceLock::new();

fn decision_id_re() -> &'static Regex {
    DECISION_ID_RE
        .get_or_init(|| Regex::new(r#"(?m)^decision_id:\s*"?(?P<id>[^\n"]+)"?\s*$"#).unwrap())
}

// ---------------------------------------------------------------------------
// DecisionRecord
// ---------------------------------------------------------------------------

/// A formal decision record as registered in the manifest's `adrs` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision_id: String,
    pub slug: String,
    pub category: String,
    pub status: String,
    pub owners: Vec<String>,
    pub date: String,
    pub path: String,
}

// ---------------------------------------------------------------------------
// Key extraction
// ---------------------------------------------------------------------------

/// Slug encoded in an ADR file name: the stem split on `-` at most twice,
/// last part kept. `ADR-20260101-use-postgres.md` gives `use-postgres`.
pub fn slug_from_file_name(file_name: &str) -> &str {
    let stem = file_name.strip_suffix(".md").unwrap_or(file_name);
    stem.splitn(3, '-').last().unwrap_or(stem)
}

/// The first `decision_id: <value>` line in a record, quotes stripped.
pub fn parse_decision_id(text: &str) -> Option<String> {
    let caps = decision_id_re().captures(text)?;
    let id = caps["id"].trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// DecisionIndex
// ---------------------------------------------------------------------------

/// Lookup from decision key to record path. Every record registers its
/// file-name slug, and its `decision_id` when the content declares one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionIndex {
    keys: BTreeMap<String, PathBuf>,
}

impl DecisionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every `ADR-*.md` directly inside `dir`. A missing directory gives
    /// an empty index; a record that cannot be read still contributes its slug.
    pub fn build(dir: &Path) -> Result<Self> {
        let mut index = Self::new();
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "decisions directory absent; empty index");
            return Ok(index);
        }

        let mut records = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(ADR_PREFIX) && name.ends_with(".md") && entry.path().is_file() {
                records.push((name, entry.path()));
            }
        }
        records.sort();

        for (name, path) in records {
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable decision record");
                    None
                }
            };
            index.register(slug_from_file_name(&name), text.as_deref(), &path);
        }
        tracing::debug!(dir = %dir.display(), keys = index.len(), "built decision index");
        Ok(index)
    }

    /// Register one record from its file-name slug and (optional) content.
    pub fn register(&mut self, slug: &str, content: Option<&str>, path: &Path) {
        self.keys.insert(slug.to_string(), path.to_path_buf());
        if let Some(id) = content.and_then(parse_decision_id) {
            self.keys.insert(id, path.to_path_buf());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Path> {
        self.keys.get(key).map(PathBuf::as_path)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn slug_strips_prefix_and_date() {
        assert_eq!(slug_from_file_name("ADR-20260101-use-postgres.md"), "use-postgres");
        assert_eq!(slug_from_file_name("ADR-20260101-x.md"), "x");
        assert_eq!(slug_from_file_name("ADR-only.md"), "only");
    }

    #[test]
    fn decision_id_accepts_quoted_and_bare() {
        assert_eq!(
            parse_decision_id("---\ndecision_id: \"orders-db\"\n---\n").as_deref(),
            Some("orders-db")
        );
        assert_eq!(parse_decision_id("decision_id: orders-db  \n").as_deref(), Some("orders-db"));
        assert_eq!(parse_decision_id("title: x\n  decision_id: indented\n"), None);
        assert_eq!(parse_decision_id("no id here"), None);
    }

    #[test]
    fn build_registers_slug_and_declared_id() {
        let dir = TempDir::new().unwrap();
        let adr = dir.path().join("ADR-20260101-use-postgres.md");
        std::fs::write(&adr, "---\ndecision_id: \"orders-store\"\n---\n# Use Postgres\n").unwrap();

        let index = DecisionIndex::build(dir.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("use-postgres"), Some(adr.as_path()));
        assert_eq!(index.get("orders-store"), Some(adr.as_path()));
    }

    #[test]
    fn record_without_id_contributes_slug_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ADR-20260101-use-postgres.md"), "# Use Postgres\n").unwrap();
        let index = DecisionIndex::build(dir.path()).unwrap();
        assert_eq!(index.keys().collect::<Vec<_>>(), ["use-postgres"]);
    }

    #[test]
    fn non_adr_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README.md"), "decision_id: readme").unwrap();
        std::fs::write(dir.path().join("ADR-20260101-a.txt"), "decision_id: txt").unwrap();
        let index = DecisionIndex::build(dir.path()).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn missing_directory_is_empty_index() {
        let dir = TempDir::new().unwrap();
        let index = DecisionIndex::build(&dir.path().join("decisions")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn lookup_is_exact() {
        let mut index = DecisionIndex::new();
        index.register("use-postgres", None, Path::new("ADR-1-use-postgres.md"));
        assert!(index.contains("use-postgres"));
        assert!(!index.contains("Use-Postgres"));
        assert!(!index.contains("use-postgre"));
    }

    #[test]
    fn decision_record_yaml_roundtrip() {
        let record = DecisionRecord {
            decision_id: "use-postgres".to_string(),
            slug: "use-postgres".to_string(),
            category: "data".to_string(),
            status: "accepted".to_string(),
            owners: vec!["alice".to_string(), "bob".to_string()],
            date: "2026-01-01".to_string(),
            path: "docs/architecture/decisions/ADR-20260101-use-postgres.md".to_string(),
        };
        let yaml = serde_yaml::to_string(&record).unwrap();
        let parsed: DecisionRecord = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, record);
    }
}
