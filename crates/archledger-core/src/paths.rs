use crate::error::{LedgerError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const ARCH_DIR: &str = "docs/architecture";
pub const DECISIONS_DIR: &str = "docs/architecture/decisions";
pub const REVIEWS_DIR: &str = "docs/architecture/reviews";
pub const DIAGRAMS_DIR: &str = "docs/architecture/diagrams";
pub const THREAT_MODELS_DIR: &str = "docs/architecture/threat-models";
pub const RUNBOOKS_DIR: &str = "docs/architecture/runbooks";
pub const SOLUTION_OVERVIEWS_DIR: &str = "docs/architecture/solution-overviews";
pub const LEGACY_MANIFEST_DIR: &str = "docs/architecture/manifest";

pub const INDEX_FILE: &str = "docs/architecture/index.md";
pub const CONFIG_FILE: &str = "docs/architecture/archledger.yaml";

pub const ADR_PREFIX: &str = "ADR-";
pub const REVIEW_PREFIX: &str = "WA-REVIEW-";
pub const TRACE_PREFIX: &str = "DECISION-TRACE-";

/// Every directory `init` creates, keyed by the name recorded in the manifest.
pub const ARCH_SUBDIRS: &[(&str, &str)] = &[
    ("decisions_dir", DECISIONS_DIR),
    ("reviews_dir", REVIEWS_DIR),
    ("diagrams_dir", DIAGRAMS_DIR),
    ("threat_models_dir", THREAT_MODELS_DIR),
    ("runbooks_dir", RUNBOOKS_DIR),
    ("solution_overviews_dir", SOLUTION_OVERVIEWS_DIR),
    ("manifest_dir", LEGACY_MANIFEST_DIR),
];

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn arch_dir(root: &Path) -> PathBuf {
    root.join(ARCH_DIR)
}

pub fn decisions_dir(root: &Path) -> PathBuf {
    root.join(DECISIONS_DIR)
}

pub fn reviews_dir(root: &Path) -> PathBuf {
    root.join(REVIEWS_DIR)
}

pub fn solution_overviews_dir(root: &Path) -> PathBuf {
    root.join(SOLUTION_OVERVIEWS_DIR)
}

pub fn index_path(root: &Path) -> PathBuf {
    root.join(INDEX_FILE)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Canonical manifest location: `<root>/<system>.yaml`.
pub fn manifest_path(root: &Path, system: &str) -> PathBuf {
    root.join(format!("{system}.yaml"))
}

/// Location used by earlier workflow versions.
pub fn legacy_manifest_path(root: &Path, system: &str) -> PathBuf {
    root.join(LEGACY_MANIFEST_DIR).join(format!("{system}.yaml"))
}

pub fn adr_path(root: &Path, ymd: &str, slug: &str) -> PathBuf {
    decisions_dir(root).join(format!("{ADR_PREFIX}{ymd}-{slug}.md"))
}

pub fn review_path(root: &Path, ymd: &str, system: &str) -> PathBuf {
    reviews_dir(root).join(format!("{REVIEW_PREFIX}{ymd}-{}.md", slugify(system, "system")))
}

pub fn trace_path(root: &Path, ymd: &str, system: &str) -> PathBuf {
    reviews_dir(root).join(format!("{TRACE_PREFIX}{ymd}-{}.md", slugify(system, "system")))
}

// ---------------------------------------------------------------------------
// Repo root
// ---------------------------------------------------------------------------

pub fn is_repo_root(dir: &Path) -> bool {
    dir.join(".git").exists() || dir.join(".agents").join("skills").exists()
}

/// Walk upward from `start` to the first directory holding `.git/` or
/// `.agents/skills/`.
pub fn resolve_repo_root(start: &Path) -> Result<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if is_repo_root(&dir) {
            return Ok(dir);
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => return Err(LedgerError::RepoRootNotFound(start.to_path_buf())),
        }
    }
}

// ---------------------------------------------------------------------------
// Slugs and system identifiers
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();
static NON_ALNUM_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

fn non_alnum_re() -> &'static Regex {
    NON_ALNUM_RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]+").unwrap())
}

/// Lowercase `value` and collapse every non-alphanumeric run into one hyphen.
/// Returns `fallback` when nothing survives.
pub fn slugify(value: &str, fallback: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let slug = non_alnum_re().replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug.to_string()
    }
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 96 || !slug_re().is_match(slug) {
        return Err(LedgerError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

/// The system identifier names the manifest file, so it must stay a single
/// path component.
pub fn validate_system(system: &str) -> Result<()> {
    let trimmed = system.trim();
    if trimmed.is_empty()
        || trimmed != system
        || system == "."
        || system == ".."
        || system.contains(['/', '\\'])
    {
        return Err(LedgerError::InvalidSystem(system.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Document discovery
// ---------------------------------------------------------------------------

/// Newest `.md` file in `dir` whose name starts with `prefix` and contains
/// `needle` after the prefix. Modification time decides; ties fall back to
/// the file name so the choice is stable. A missing directory yields `None`.
pub fn latest_matching(dir: &Path, prefix: &str, needle: &str) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let mut best: Option<(SystemTime, String, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(rest) = name.strip_prefix(prefix) else {
            continue;
        };
        if !name.ends_with(".md") || !rest.contains(needle) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        let newer = match &best {
            None => true,
            Some((t, n, _)) => (modified, &name) > (*t, n),
        };
        if newer {
            best = Some((modified, name, entry.path()));
        }
    }
    Ok(best.map(|(_, _, path)| path))
}

/// Newest document for `system` under `dir`, matching either the raw
/// identifier or its slug form.
pub fn latest_for_system(dir: &Path, prefix: &str, system: &str) -> Result<Option<PathBuf>> {
    if let Some(found) = latest_matching(dir, prefix, system)? {
        return Ok(Some(found));
    }
    let slug = slugify(system, "system");
    if slug == system {
        return Ok(None);
    }
    latest_matching(dir, prefix, &slug)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Use Postgres for Orders!", "decision"), "use-postgres-for-orders");
        assert_eq!(slugify("  Payments API ", "system"), "payments-api");
        assert_eq!(slugify("***", "decision"), "decision");
    }

    #[test]
    fn valid_slugs() {
        for slug in ["use-postgres", "a", "adopt-dynamo-2"] {
            validate_slug(slug).unwrap_or_else(|_| panic!("expected valid: {slug}"));
        }
    }

    #[test]
    fn invalid_slugs() {
        for slug in ["", "-lead", "trail-", "has spaces", "UPPER", "a_b"] {
            assert!(validate_slug(slug).is_err(), "expected invalid: {slug}");
        }
    }

    #[test]
    fn system_identifier_rules() {
        validate_system("payments").unwrap();
        validate_system("Payments-API").unwrap();
        for bad in ["", " payments", "a/b", "a\\b", "..", "."] {
            assert!(validate_system(bad).is_err(), "expected invalid: {bad:?}");
        }
    }

    #[test]
    fn manifest_locations() {
        let root = Path::new("/tmp/repo");
        assert_eq!(manifest_path(root, "payments"), PathBuf::from("/tmp/repo/payments.yaml"));
        assert_eq!(
            legacy_manifest_path(root, "payments"),
            PathBuf::from("/tmp/repo/docs/architecture/manifest/payments.yaml")
        );
    }

    #[test]
    fn generated_document_names() {
        let root = Path::new("/r");
        assert_eq!(
            adr_path(root, "20260101", "use-postgres"),
            PathBuf::from("/r/docs/architecture/decisions/ADR-20260101-use-postgres.md")
        );
        assert_eq!(
            review_path(root, "20260101", "Payments API"),
            PathBuf::from("/r/docs/architecture/reviews/WA-REVIEW-20260101-payments-api.md")
        );
    }

    #[test]
    fn resolve_repo_root_walks_up() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let deep = dir.path().join("src/deep");
        std::fs::create_dir_all(&deep).unwrap();
        assert_eq!(resolve_repo_root(&deep).unwrap(), dir.path());
    }

    #[test]
    fn resolve_repo_root_accepts_skills_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".agents/skills")).unwrap();
        assert_eq!(resolve_repo_root(dir.path()).unwrap(), dir.path());
    }

    #[test]
    fn latest_matching_filters_by_prefix_and_needle() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("WA-REVIEW-20260101-payments.md"), "a").unwrap();
        std::fs::write(dir.path().join("WA-REVIEW-20260101-billing.md"), "b").unwrap();
        std::fs::write(dir.path().join("DECISION-TRACE-20260101-payments.md"), "c").unwrap();
        let found = latest_matching(dir.path(), REVIEW_PREFIX, "payments").unwrap();
        assert_eq!(
            found.unwrap().file_name().unwrap(),
            "WA-REVIEW-20260101-payments.md"
        );
        assert!(latest_matching(dir.path(), REVIEW_PREFIX, "orders").unwrap().is_none());
    }

    #[test]
    fn latest_matching_missing_dir_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(latest_matching(&dir.path().join("nope"), "", "x").unwrap().is_none());
    }

    #[test]
    fn latest_for_system_falls_back_to_slug() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("WA-REVIEW-20260101-payments-api.md"), "a").unwrap();
        let found = latest_for_system(dir.path(), REVIEW_PREFIX, "Payments API").unwrap();
        assert!(found.is_some());
    }
}
