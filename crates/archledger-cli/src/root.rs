use anyhow::Context;
use archledger_core::paths;
use std::path::{Path, PathBuf};

/// Resolve the repository root.
///
/// Priority:
/// 1. `--root` flag / `ARCHLEDGER_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` to the first directory holding `.git/` or
///    `.agents/skills/`
///
/// Failing both is fatal; documents are never written relative to an
/// arbitrary working directory.
pub fn resolve_root(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(p) = explicit {
        if !p.is_dir() {
            anyhow::bail!("repo root {} is not a directory", p.display());
        }
        return Ok(p.to_path_buf());
    }

    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let root = paths::resolve_repo_root(&cwd)?;
    tracing::debug!(root = %root.display(), "resolved repo root");
    Ok(root)
}
