mod cmd;

use clap::{Parser, Subcommand};
use cmd::{context::ContextSubcommand, hook::HookSubcommand, state::StateSubcommand};
use stagehand_core::paths;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stagehand",
    about = "Lifecycle hooks for coding-assistant hosts — prompt routing, context pruning, decision capture",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root holding the .stagehand/ state directory
    #[arg(long, global = true, env = "STAGEHAND_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Host-invoked hook entry points (JSON in on stdin, JSON result on stdout)
    Hook {
        #[command(subcommand)]
        subcommand: HookSubcommand,
    },

    /// Score a prompt against the agent/skill catalog
    Classify {
        /// Prompt text to classify
        prompt: String,
        /// Apply a session's history and cooldowns
        #[arg(long)]
        session: Option<String>,
    },

    /// Inspect and update per-session context-budget state
    Context {
        #[command(subcommand)]
        subcommand: ContextSubcommand,
    },

    /// Inspect per-session orchestration state
    State {
        #[command(subcommand)]
        subcommand: StateSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();
    let root = cli
        .root
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    init_logging(&root);

    let outcome = match cli.command {
        Commands::Hook { subcommand } => {
            // Hook commands are infallible by contract: the host must always
            // receive a valid result and exit code 0.
            cmd::hook::run(&root, subcommand);
            Ok(())
        }
        Commands::Classify { prompt, session } => {
            cmd::classify::run(&root, &prompt, session.as_deref())
        }
        Commands::Context { subcommand } => cmd::context::run(&root, subcommand, cli.json),
        Commands::State { subcommand } => cmd::state::run(&root, subcommand, cli.json),
    };

    if let Err(e) = outcome {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

/// Side-channel log under the state dir. Hooks must keep stdout clean for
/// the host, so tracing output never goes to the console.
fn init_logging(root: &Path) {
    let path = paths::log_path(root);
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = std::fs::OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let filter = EnvFilter::try_from_env("STAGEHAND_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .try_init();
}
