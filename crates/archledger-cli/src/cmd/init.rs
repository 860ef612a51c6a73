use crate::cmd::{display_date, display_path, Session, SystemArgs};
use crate::output::print_json;
use anyhow::Context;
use archledger_core::baseline::{BaselineArtifact, BaselinePack};
use archledger_core::config::Config;
use archledger_core::io::{self, WriteOutcome};
use archledger_core::paths;
use archledger_core::templates::{diagram_placeholder, Template};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const INDEX_HEADER: &str = "# Architecture Index\n\n";

const INDEX_LINES: &[&str] = &[
    "- Decisions: `docs/architecture/decisions/`",
    "- Reviews: `docs/architecture/reviews/`",
    "- Diagrams: `docs/architecture/diagrams/`",
    "- Threat Models: `docs/architecture/threat-models/`",
    "- Runbooks: `docs/architecture/runbooks/`",
    "- Solution Overviews: `docs/architecture/solution-overviews/`",
    "- Manifest: `docs/architecture/manifest/`",
];

#[derive(Args)]
pub struct InitArgs {
    #[command(flatten)]
    pub system: SystemArgs,

    /// Regenerate the template-derived baseline documents (solution overview,
    /// threat model, runbook); diagram placeholders are never overwritten
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Default, Serialize)]
struct BaselineStates {
    created: Vec<String>,
    existing: Vec<String>,
    overwritten: Vec<String>,
}

impl BaselineStates {
    fn push(&mut self, outcome: WriteOutcome, path: &Path) {
        let path = path.display().to_string();
        match outcome {
            WriteOutcome::Created => self.created.push(path),
            WriteOutcome::Existing => self.existing.push(path),
            WriteOutcome::Overwritten => self.overwritten.push(path),
        }
    }
}

pub fn run(root: Option<&Path>, args: InitArgs, json: bool) -> anyhow::Result<()> {
    let mut session = Session::open(root, &args.system)?;
    let root = session.root.clone();
    let system = session.system.clone();

    // 1. Render every baseline document before touching the tree, so a
    //    missing template override fails the command with nothing written.
    let date = display_date(None)?;
    let vars = [
        ("system", system.as_str()),
        ("date", date.as_str()),
        ("owners", "TBD"),
    ];
    let templates = session.templates();
    let mut documents: Vec<(PathBuf, String, bool)> = Vec::new();
    for &artifact in BaselineArtifact::all() {
        let path = artifact.path(&root, &system);
        let (content, overwrite) = match Template::for_baseline(artifact) {
            Some(template) => (templates.render(template, &vars)?, args.force),
            None => (diagram_placeholder(artifact).unwrap_or_default().to_string(), false),
        };
        documents.push((path, content, overwrite));
    }

    // 2. Architecture directories
    for (_, dir) in paths::ARCH_SUBDIRS {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    // 3. Index
    let index_path = paths::index_path(&root);
    for line in INDEX_LINES {
        io::ensure_line(&index_path, INDEX_HEADER, line)
            .with_context(|| format!("failed to update {}", index_path.display()))?;
    }

    // 4. Config, if missing
    let config_path = paths::config_path(&root);
    if !config_path.exists() {
        Config::default()
            .save(&root)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
    }

    // 5. Baseline document pack
    let mut states = BaselineStates::default();
    for (path, content, overwrite) in &documents {
        let outcome = io::write_document(path, content.as_bytes(), *overwrite)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), ?outcome, "baseline document");
        states.push(outcome, path);
    }

    // 6. Manifest
    let pack = BaselinePack::for_system(&root, &system);
    session.manifest.set_artifact("index", &index_path.display().to_string())?;
    for (key, dir) in paths::ARCH_SUBDIRS {
        session
            .manifest
            .set_artifact(key, &root.join(dir).display().to_string())?;
    }
    session.manifest.set_artifact("baseline_doc_pack", &pack)?;

    let manifest_path = session.manifest_path().display().to_string();
    session.record_action(
        "init",
        serde_json::json!({
            "system": system,
            "interactive": args.system.interactive,
            "force": args.force,
        }),
        serde_json::json!({
            "index_path": index_path.display().to_string(),
            "manifest_path": manifest_path,
            "baseline_doc_pack": pack,
            "baseline_created": states.created,
            "baseline_existing": states.existing,
            "baseline_overwritten": states.overwritten,
        }),
        0,
    )?;
    session.save()?;

    if json {
        print_json(&serde_json::json!({
            "system": system,
            "manifest_path": manifest_path,
            "baseline": states,
        }))?;
        return Ok(());
    }

    println!("Initialized architecture workflow for system '{system}'.");
    println!("Manifest: {}", display_path(&root, session.manifest_path()));
    println!("Baseline created: {}", states.created.len());
    println!("Baseline existing: {}", states.existing.len());
    println!("Baseline overwritten: {}", states.overwritten.len());
    Ok(())
}
