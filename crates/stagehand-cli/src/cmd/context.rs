use anyhow::Context as _;
use clap::Subcommand;
use stagehand_core::advisor::ContextState;
use stagehand_core::config::Config;
use stagehand_core::paths;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ContextSubcommand {
    /// Record that a context item was loaded or re-referenced
    Touch {
        /// Session id
        #[arg(long)]
        session: String,
        /// Item id with type prefix (skill:/file:/agent:)
        #[arg(long)]
        id: String,
        /// Estimated token footprint (counted once, on first load)
        #[arg(long, default_value_t = 0)]
        tokens: u64,
        /// Relevance tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Show the session's context items
    Show {
        /// Session id
        #[arg(long)]
        session: String,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ContextSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ContextSubcommand::Touch {
            session,
            id,
            tokens,
            tags,
        } => touch(root, &session, &id, tokens, tags),
        ContextSubcommand::Show { session } => show(root, &session, json),
    }
}

fn touch(root: &Path, session: &str, id: &str, tokens: u64, tags: Vec<String>) -> anyhow::Result<()> {
    paths::validate_session_id(session).context("invalid --session")?;
    let config = Config::load(root)?;
    let now = chrono::Utc::now();
    let mut state = ContextState::load(root, session, &config.advisor);
    state.touch(id, tokens, tags, now);
    state.save(root, now).context("failed to write context state")?;
    Ok(())
}

fn show(root: &Path, session: &str, json: bool) -> anyhow::Result<()> {
    paths::validate_session_id(session).context("invalid --session")?;
    let config = Config::load(root)?;
    let state = ContextState::load(root, session, &config.advisor);
    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!(
        "session {}: {} / {} tokens ({:.0}% of budget)",
        state.session_id,
        state.total_context_tokens,
        state.context_budget,
        state.usage_ratio() * 100.0
    );
    for item in &state.items {
        println!(
            "  {}  accesses {}  last {}  ~{} tokens",
            item.id,
            item.access_count,
            item.last_accessed.format("%H:%M:%S"),
            item.estimated_tokens
        );
    }
    Ok(())
}
