use crate::cmd::{display_date, display_path, today_ymd, Session, SystemArgs};
use crate::output::print_json;
use anyhow::Context;
use archledger_core::io::{self, WriteOutcome};
use archledger_core::manifest::{ManifestList, ReviewEntry};
use archledger_core::paths;
use archledger_core::templates::Template;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum ReviewSubcommand {
    /// Generate a Well-Architected review document for a system
    New {
        #[command(flatten)]
        system: SystemArgs,

        /// Review date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,

        /// Reviewer names written into the document header
        #[arg(long, default_value = "TBD")]
        reviewers: String,

        /// Replace today's review if one already exists
        #[arg(long)]
        force: bool,
    },
}

pub fn run(root: Option<&Path>, subcmd: ReviewSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ReviewSubcommand::New {
            system,
            date,
            reviewers,
            force,
        } => new_review(root, &system, date.as_deref(), &reviewers, force, json),
    }
}

fn new_review(
    root: Option<&Path>,
    args: &SystemArgs,
    date: Option<&str>,
    reviewers: &str,
    force: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut session = Session::open(root, args)?;
    let system = session.system.clone();
    let date = display_date(date)?;

    let content = session.templates().render(
        Template::WaReview,
        &[
            ("system", system.as_str()),
            ("date", date.as_str()),
            ("reviewers", reviewers),
        ],
    )?;

    let out_path = paths::review_path(&session.root, &today_ymd(), &system);
    let outcome = io::write_document(&out_path, content.as_bytes(), force)
        .with_context(|| format!("failed to write {}", out_path.display()))?;
    if outcome == WriteOutcome::Existing {
        anyhow::bail!(
            "review {} already exists; pass --force to replace it",
            out_path.display()
        );
    }
    tracing::info!(path = %out_path.display(), ?outcome, "wrote review");

    let path = out_path.display().to_string();
    session.append(
        ManifestList::WaReviews,
        &ReviewEntry {
            path: path.clone(),
            date: date.clone(),
        },
    )?;
    session.record_action(
        "review_new",
        serde_json::json!({
            "system": system,
            "date": date,
            "reviewers": reviewers,
            "force": force,
            "interactive": args.interactive,
        }),
        serde_json::json!({ "wa_review_path": path }),
        0,
    )?;
    session.save()?;

    if json {
        print_json(&serde_json::json!({ "system": system, "path": path, "date": date }))?;
    } else {
        println!("{}", display_path(&session.root, &out_path));
    }
    Ok(())
}
