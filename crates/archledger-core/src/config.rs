use crate::error::Result;
use crate::gate::GateThresholds;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_version() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Project settings read from `docs/architecture/archledger.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub gate: GateThresholds,
    /// Directory holding markdown templates that replace the built-in ones,
    /// relative to the repo root unless absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            gate: GateThresholds::default(),
            templates_dir: None,
        }
    }
}

impl Config {
    /// Load the config, or the defaults when the file does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Absolute template override directory, if configured.
    pub fn templates_dir(&self, root: &Path) -> Option<PathBuf> {
        self.templates_dir.as_ref().map(|dir| root.join(dir))
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
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.gate.max_needs_work, 2);
        assert!(!cfg.gate.allow_fail_pillars);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = paths::config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "gate:\n  max_needs_work: 0\n").unwrap();

        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.gate.max_needs_work, 0);
        assert!(!cfg.gate.allow_fail_pillars);
        assert!(cfg.templates_dir.is_none());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(paths::arch_dir(dir.path())).unwrap();
        let cfg = Config {
            version: 1,
            gate: GateThresholds {
                max_needs_work: 4,
                allow_fail_pillars: true,
            },
            templates_dir: Some(PathBuf::from("tools/templates")),
        };
        cfg.save(dir.path()).unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), cfg);
        assert_eq!(
            cfg.templates_dir(dir.path()),
            Some(dir.path().join("tools/templates"))
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = paths::config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "gate: [1, 2\n").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }
}
