use crate::cmd::{display_path, Session, SystemArgs};
use crate::output::{print_json, print_table};
use archledger_core::manifest::ManifestList;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum ManifestSubcommand {
    /// Show a system's manifest (migrating a legacy manifest forward if needed)
    Show {
        #[command(flatten)]
        system: SystemArgs,
    },
}

pub fn run(root: Option<&Path>, subcmd: ManifestSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ManifestSubcommand::Show { system } => show(root, &system, json),
    }
}

fn show(root: Option<&Path>, args: &SystemArgs, json: bool) -> anyhow::Result<()> {
    let mut session = Session::open(root, args)?;

    // Read-only, except that a migration must be persisted along with its
    // action entry.
    if let Some(from) = session.manifest.migrated_from() {
        tracing::info!(from = %from.display(), "persisting migrated manifest");
        session.save()?;
    }

    if json {
        print_json(&session.manifest)?;
        return Ok(());
    }

    let manifest = &session.manifest;
    println!("System:   {}", manifest.system.as_deref().unwrap_or(&session.system));
    println!("Manifest: {}", display_path(&session.root, session.manifest_path()));
    println!(
        "Updated:  {}",
        manifest.last_updated.as_deref().unwrap_or("never")
    );
    if let Some(from) = manifest.migrated_from() {
        println!("Migrated: {}", display_path(&session.root, from));
    }
    println!();

    let rows = ManifestList::all()
        .iter()
        .map(|&list| vec![list.key().to_string(), manifest.entries(list).len().to_string()])
        .collect();
    print_table(&["LIST", "ENTRIES"], rows);
    Ok(())
}
