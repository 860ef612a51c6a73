pub mod adr;
pub mod init;
pub mod manifest;
pub mod review;
pub mod trace;
pub mod validate;

use anyhow::Context;
use archledger_core::config::Config;
use archledger_core::manifest::{ActionEntry, Manifest, ManifestList, ManifestStore};
use archledger_core::paths;
use archledger_core::templates::TemplateSet;
use chrono::{NaiveDate, Utc};
use clap::Args;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Required input
// ---------------------------------------------------------------------------

/// A required value was neither passed nor supplied at the prompt.
#[derive(Debug, thiserror::Error)]
#[error("missing required argument --{0}. Pass --{0} <value> or add --interactive for prompt mode.")]
pub struct MissingInput(pub String);

#[derive(Args, Debug, Clone)]
pub struct SystemArgs {
    /// System identifier; names the manifest file `<root>/<system>.yaml`
    #[arg(long)]
    pub system: Option<String>,

    /// Prompt on stdin for any missing required value
    #[arg(long)]
    pub interactive: bool,
}

/// Return `value`, or prompt for it when `interactive`. Blank answers and a
/// closed stdin count as missing.
pub fn require(value: Option<String>, name: &str, interactive: bool) -> Result<String, MissingInput> {
    if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
        return Ok(v);
    }
    if interactive {
        if let Some(answer) = prompt(name) {
            return Ok(answer);
        }
    }
    Err(MissingInput(name.to_string()))
}

fn prompt(name: &str) -> Option<String> {
    eprint!("{name}: ");
    let _ = std::io::stderr().flush();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => {
            let answer = line.trim();
            (!answer.is_empty()).then(|| answer.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

pub fn today_ymd() -> String {
    Utc::now().format("%Y%m%d").to_string()
}

/// `--date` if given (must be `YYYY-MM-DD`), otherwise today in UTC.
pub fn display_date(date: Option<&str>) -> anyhow::Result<String> {
    match date {
        Some(d) => {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .with_context(|| format!("invalid --date '{d}': expected YYYY-MM-DD"))?;
            Ok(d.to_string())
        }
        None => Ok(Utc::now().format("%Y-%m-%d").to_string()),
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One command invocation against one system's manifest. Records are
/// appended in memory and written by a single [`Session::save`] at the end,
/// so a command that fails midway leaves the manifest untouched.
pub struct Session {
    pub root: PathBuf,
    pub system: String,
    pub config: Config,
    pub store: ManifestStore,
    pub manifest: Manifest,
}

impl Session {
    pub fn open(root: Option<&Path>, args: &SystemArgs) -> anyhow::Result<Self> {
        let system = require(args.system.clone(), "system", args.interactive)?;
        paths::validate_system(&system)?;
        let root = crate::root::resolve_root(root)?;
        let config = Config::load(&root).context("failed to load docs/architecture/archledger.yaml")?;
        let store = ManifestStore::for_system(&root, &system);
        let manifest = store
            .load()
            .with_context(|| format!("failed to load manifest {}", store.path().display()))?;
        Ok(Self {
            root,
            system,
            config,
            store,
            manifest,
        })
    }

    pub fn templates(&self) -> TemplateSet {
        TemplateSet::from_config(&self.root, &self.config)
    }

    pub fn manifest_path(&self) -> &Path {
        self.store.path()
    }

    pub fn append<T: serde::Serialize>(&mut self, list: ManifestList, entry: &T) -> anyhow::Result<()> {
        self.manifest
            .append(list, entry)
            .with_context(|| format!("failed to record {list} entry"))
    }

    pub fn record_action(
        &mut self,
        tool: &str,
        inputs: serde_json::Value,
        outputs: serde_json::Value,
        exit_code: i32,
    ) -> anyhow::Result<()> {
        let entry = ActionEntry::new(tool, inputs, outputs, exit_code);
        self.append(ManifestList::Actions, &entry)
    }

    /// Stamp the common header fields and write the manifest.
    pub fn save(&mut self) -> anyhow::Result<()> {
        self.manifest
            .stamp(&self.system, &self.root, self.store.path());
        self.store
            .save(&mut self.manifest)
            .with_context(|| format!("failed to save manifest {}", self.store.path().display()))
    }
}

/// Path relative to the repo root for display, absolute otherwise.
pub fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
