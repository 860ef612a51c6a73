use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("could not resolve repo root from {0}: no .git/ or .agents/skills/ found")]
    RepoRootNotFound(PathBuf),

    #[error("invalid system identifier '{0}': must be non-empty and contain no path separators")]
    InvalidSystem(String),

    #[error("invalid slug '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("manifest at {0} must be a mapping")]
    ManifestNotMapping(PathBuf),

    #[error(
        "manifest at {path} was modified by another writer (expected last_updated {expected}, found {found})"
    )]
    ManifestConflict {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("template not found: {0}")]
    TemplateNotFound(PathBuf),

    #[error("invalid value for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
