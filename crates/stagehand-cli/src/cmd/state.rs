use anyhow::Context as _;
use clap::Subcommand;
use stagehand_core::paths;
use stagehand_core::session::SessionState;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum StateSubcommand {
    /// Show a session's orchestration state
    Show {
        /// Session id
        #[arg(long)]
        session: String,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: StateSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        StateSubcommand::Show { session } => show(root, &session, json),
    }
}

fn show(root: &Path, session: &str, json: bool) -> anyhow::Result<()> {
    paths::validate_session_id(session).context("invalid --session")?;
    let state = SessionState::load(root, session);
    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!("session {}", state.session_id);
    println!("prompts recorded: {}", state.prompt_history.len());
    if let Some(last) = state.prompt_history.last() {
        println!("last prompt: {}", last.text);
    }
    if state.dispatched_agents.is_empty() {
        println!("no agents on cooldown");
    } else {
        println!("agents on cooldown:");
        for (agent, record) in &state.dispatched_agents {
            println!(
                "  {agent}  confidence {}  dispatched {}",
                record.confidence,
                record.dispatched_at.format("%H:%M:%S")
            );
        }
    }
    Ok(())
}
