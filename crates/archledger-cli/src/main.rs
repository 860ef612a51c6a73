mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    adr::AdrSubcommand, init::InitArgs, manifest::ManifestSubcommand, review::ReviewSubcommand,
    trace::TraceArgs, validate::ValidateArgs, MissingInput,
};
use std::path::PathBuf;

const EXIT_GATE_FAILED: i32 = 1;
const EXIT_MISSING_INPUT: i32 = 2;
const EXIT_FATAL: i32 = 3;

#[derive(Parser)]
#[command(
    name = "archledger",
    about = "Architecture decision ledger: trace MAJOR_DECISION markers to ADRs and gate Well-Architected reviews",
    version,
    propagate_version = true
)]
struct Cli {
    /// Repository root (default: walk up from cwd to .git/ or .agents/skills/)
    #[arg(long, global = true, env = "ARCHLEDGER_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold docs/architecture and the baseline document pack for a system
    Init(InitArgs),

    /// Manage Well-Architected reviews
    Review {
        #[command(subcommand)]
        subcommand: ReviewSubcommand,
    },

    /// Manage architecture decision records
    Adr {
        #[command(subcommand)]
        subcommand: AdrSubcommand,
    },

    /// Write a report linking every MAJOR_DECISION marker to its ADR
    Trace(TraceArgs),

    /// Check baseline artifacts, review scores and ADR coverage against the gate
    Validate(ValidateArgs),

    /// Inspect a system's manifest
    Manifest {
        #[command(subcommand)]
        subcommand: ManifestSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = cli.root.as_deref();

    let result = match cli.command {
        Commands::Init(args) => cmd::init::run(root, args, cli.json),
        Commands::Review { subcommand } => cmd::review::run(root, subcommand, cli.json),
        Commands::Adr { subcommand } => cmd::adr::run(root, subcommand, cli.json),
        Commands::Trace(args) => cmd::trace::run(root, args, cli.json),
        Commands::Validate(args) => cmd::validate::run(root, args, cli.json).map(|passed| {
            if !passed {
                std::process::exit(EXIT_GATE_FAILED);
            }
        }),
        Commands::Manifest { subcommand } => cmd::manifest::run(root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        let code = if e.downcast_ref::<MissingInput>().is_some() {
            EXIT_MISSING_INPUT
        } else {
            EXIT_FATAL
        };
        std::process::exit(code);
    }
}
