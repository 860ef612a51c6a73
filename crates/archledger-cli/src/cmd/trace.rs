use crate::cmd::{display_date, display_path, today_ymd, Session, SystemArgs};
use crate::output::print_json;
use anyhow::Context;
use archledger_core::decision::DecisionIndex;
use archledger_core::io;
use archledger_core::manifest::{now_rfc3339, ManifestList, TraceEntry};
use archledger_core::paths;
use archledger_core::trace::DecisionTrace;
use archledger_core::validation::SystemDocuments;
use clap::Args;
use std::path::Path;

#[derive(Args)]
pub struct TraceArgs {
    #[command(flatten)]
    pub system: SystemArgs,

    /// Report date (YYYY-MM-DD, default today)
    #[arg(long)]
    pub date: Option<String>,
}

pub fn run(root: Option<&Path>, args: TraceArgs, json: bool) -> anyhow::Result<()> {
    let mut session = Session::open(root, &args.system)?;
    let system = session.system.clone();
    let date = display_date(args.date.as_deref())?;

    let documents = SystemDocuments::discover(&session.root, &system)?;
    let scan = documents.scan_markers().context("failed to read system documents")?;
    let index = DecisionIndex::build(&paths::decisions_dir(&session.root))?;
    let trace = DecisionTrace::build(&system, &date, documents.sources(), &scan, &index);

    let out_path = paths::trace_path(&session.root, &today_ymd(), &system);
    io::atomic_write(&out_path, trace.render_markdown().as_bytes())
        .with_context(|| format!("failed to write {}", out_path.display()))?;
    tracing::info!(
        path = %out_path.display(),
        markers = trace.marker_count(),
        unmapped = trace.unmapped_count(),
        "wrote decision trace"
    );

    let path = out_path.display().to_string();
    session.append(
        ManifestList::DecisionTraces,
        &TraceEntry {
            path: path.clone(),
            timestamp: now_rfc3339(),
            marker_count: trace.marker_count(),
            unmapped_count: trace.unmapped_count(),
        },
    )?;
    session.record_action(
        "trace",
        serde_json::json!({
            "system": system,
            "date": date,
            "interactive": args.system.interactive,
        }),
        serde_json::json!({
            "decision_trace_path": path,
            "marker_count": trace.marker_count(),
            "unmapped_count": trace.unmapped_count(),
        }),
        0,
    )?;
    session.save()?;

    if json {
        print_json(&serde_json::json!({ "path": path, "trace": trace }))?;
    } else {
        println!("{}", display_path(&session.root, &out_path));
        if trace.unmapped_count() > 0 {
            eprintln!(
                "{} of {} markers have no matching ADR",
                trace.unmapped_count(),
                trace.marker_count()
            );
        }
    }
    Ok(())
}
