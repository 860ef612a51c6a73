use crate::cmd::{Session, SystemArgs};
use crate::output::{print_issues, print_json};
use archledger_core::baseline::BaselinePack;
use archledger_core::gate::GateThresholds;
use archledger_core::manifest::{now_rfc3339, ManifestList, ValidationEntry};
use archledger_core::validation;
use clap::Args;
use std::path::Path;

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub system: SystemArgs,

    /// Most pillars allowed to score Needs Work (default from config, else 2)
    #[arg(long)]
    pub max_needs_work: Option<u32>,

    /// Do not fail the gate on pillars scored Fail
    #[arg(long)]
    pub allow_fail_pillars: bool,
}

/// Run the gate and record it. Returns whether it passed; the caller turns a
/// failure into the gate-failed exit code after the manifest is saved.
pub fn run(root: Option<&Path>, args: ValidateArgs, json: bool) -> anyhow::Result<bool> {
    let mut session = Session::open(root, &args.system)?;
    let system = session.system.clone();

    let thresholds = GateThresholds {
        max_needs_work: args
            .max_needs_work
            .unwrap_or(session.config.gate.max_needs_work),
        allow_fail_pillars: args.allow_fail_pillars || session.config.gate.allow_fail_pillars,
    };

    let report = validation::validate(&session.root, &system, thresholds)?;
    let messages = report.verdict.messages();
    let passed = report.verdict.passed();
    let exit_code = if passed { 0 } else { 1 };

    session.manifest.set_artifact(
        "baseline_doc_pack",
        &BaselinePack::for_system(&session.root, &system),
    )?;
    session.append(
        ManifestList::Validations,
        &ValidationEntry {
            timestamp: now_rfc3339(),
            result: report.verdict.result,
            issues: messages.clone(),
            gate: thresholds,
        },
    )?;
    session.record_action(
        "validate",
        serde_json::json!({
            "system": system,
            "max_needs_work": thresholds.max_needs_work,
            "allow_fail_pillars": thresholds.allow_fail_pillars,
            "interactive": args.system.interactive,
        }),
        serde_json::json!({
            "result": report.verdict.result,
            "issues_count": messages.len(),
        }),
        exit_code,
    )?;
    session.save()?;

    if json {
        print_json(&serde_json::json!({
            "system": system,
            "result": report.verdict.result,
            "issues": messages,
            "gate": thresholds,
            "scores": report.pillars.scores,
            "documents": report.documents,
        }))?;
    } else if passed {
        println!("Validation passed.");
    } else {
        print_issues("Validation failed with actionable issues:", &messages);
    }
    Ok(passed)
}
