use crate::cmd::init::INDEX_HEADER;
use crate::cmd::{display_date, display_path, require, today_ymd, Session, SystemArgs};
use crate::output::print_json;
use anyhow::Context;
use archledger_core::decision::DecisionRecord;
use archledger_core::io::{self, WriteOutcome};
use archledger_core::manifest::ManifestList;
use archledger_core::paths;
use archledger_core::templates::{yaml_list, Template};
use archledger_core::LedgerError;
use clap::{Args, Subcommand, ValueEnum};
use std::path::Path;

#[derive(Subcommand)]
pub enum AdrSubcommand {
    /// Create an architecture decision record and register it in the manifest
    New(NewAdrArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AdrTemplate {
    Short,
    Full,
}

impl From<AdrTemplate> for Template {
    fn from(t: AdrTemplate) -> Self {
        match t {
            AdrTemplate::Short => Template::AdrShort,
            AdrTemplate::Full => Template::AdrFull,
        }
    }
}

#[derive(Args)]
pub struct NewAdrArgs {
    #[command(flatten)]
    pub system: SystemArgs,

    /// Decision title
    #[arg(long)]
    pub title: Option<String>,

    /// Decision category (e.g. data, network, security)
    #[arg(long)]
    pub category: Option<String>,

    /// Decision status (e.g. proposed, accepted)
    #[arg(long)]
    pub status: Option<String>,

    /// Comma-separated owners
    #[arg(long)]
    pub owners: Option<String>,

    /// Comma-separated tags
    #[arg(long)]
    pub tags: Option<String>,

    /// Decision key (default: slugified title); MAJOR_DECISION markers reference it
    #[arg(long)]
    pub slug: Option<String>,

    /// Decision date (YYYY-MM-DD, default today)
    #[arg(long)]
    pub date: Option<String>,

    /// Key of the decision this one supersedes
    #[arg(long, default_value = "")]
    pub supersedes: String,

    /// Key of the decision superseding this one
    #[arg(long, default_value = "")]
    pub superseded_by: String,

    #[arg(long, value_enum, default_value = "full")]
    pub template: AdrTemplate,
}

pub fn run(root: Option<&Path>, subcmd: AdrSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        AdrSubcommand::New(args) => new_adr(root, args, json),
    }
}

fn parse_csv(field: &str, value: &str) -> anyhow::Result<Vec<String>> {
    let items: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() {
        return Err(LedgerError::InvalidInput {
            field: field.to_string(),
            reason: "no values after splitting on ','".to_string(),
        }
        .into());
    }
    Ok(items)
}

fn new_adr(root: Option<&Path>, args: NewAdrArgs, json: bool) -> anyhow::Result<()> {
    let interactive = args.system.interactive;
    let system = require(args.system.system.clone(), "system", interactive)?;
    let title = require(args.title, "title", interactive)?;
    let category = require(args.category, "category", interactive)?;
    let status = require(args.status, "status", interactive)?;
    let owners = require(args.owners, "owners", interactive)?;
    let tags = require(args.tags, "tags", interactive)?;

    let owners = parse_csv("owners", &owners)?;
    let tags = parse_csv("tags", &tags)?;
    let slug = match args.slug {
        Some(s) => s,
        None => paths::slugify(&title, "decision"),
    };
    paths::validate_slug(&slug)?;
    let date = display_date(args.date.as_deref())?;

    let resolved = SystemArgs {
        system: Some(system),
        interactive,
    };
    let mut session = Session::open(root, &resolved)?;
    let system = session.system.clone();

    let owners_yaml = yaml_list(&owners);
    let tags_yaml = yaml_list(&tags);
    let content = session.templates().render(
        args.template.into(),
        &[
            ("decision_id", slug.as_str()),
            ("system", system.as_str()),
            ("category", category.as_str()),
            ("status", status.as_str()),
            ("date", date.as_str()),
            ("owners", owners_yaml.as_str()),
            ("tags", tags_yaml.as_str()),
            ("supersedes", args.supersedes.as_str()),
            ("superseded_by", args.superseded_by.as_str()),
            ("title", title.as_str()),
        ],
    )?;

    let adr_path = paths::adr_path(&session.root, &today_ymd(), &slug);
    let outcome = io::write_document(&adr_path, content.as_bytes(), false)
        .with_context(|| format!("failed to write {}", adr_path.display()))?;
    if outcome == WriteOutcome::Existing {
        anyhow::bail!("decision record {} already exists", adr_path.display());
    }
    tracing::info!(path = %adr_path.display(), "wrote decision record");

    let index_path = paths::index_path(&session.root);
    let index_line = format!("- ADR: `{}`", display_path(&session.root, &adr_path));
    io::ensure_line(&index_path, INDEX_HEADER, &index_line)
        .with_context(|| format!("failed to update {}", index_path.display()))?;

    let record = DecisionRecord {
        decision_id: slug.clone(),
        slug: slug.clone(),
        category: category.clone(),
        status: status.clone(),
        owners: owners.clone(),
        date: date.clone(),
        path: adr_path.display().to_string(),
    };
    session.append(ManifestList::Adrs, &record)?;
    session.record_action(
        "adr_new",
        serde_json::json!({
            "system": system,
            "title": title,
            "category": category,
            "status": status,
            "owners": owners,
            "tags": tags,
            "slug": slug,
            "date": date,
            "supersedes": args.supersedes,
            "superseded_by": args.superseded_by,
            "template": format!("{:?}", args.template).to_lowercase(),
            "interactive": interactive,
        }),
        serde_json::json!({
            "adr_path": record.path,
            "index_path": index_path.display().to_string(),
        }),
        0,
    )?;
    session.save()?;

    if json {
        print_json(&record)?;
    } else {
        println!("{}", display_path(&session.root, &adr_path));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_trims_and_drops_blanks() {
        assert_eq!(parse_csv("owners", " alice, ,bob ").unwrap(), ["alice", "bob"]);
    }

    #[test]
    fn csv_without_values_is_rejected() {
        assert!(parse_csv("tags", " , ").is_err());
    }
}
