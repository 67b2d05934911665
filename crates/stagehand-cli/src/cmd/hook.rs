use clap::Subcommand;
use stagehand_core::advisor;
use stagehand_core::capture;
use stagehand_core::catalog::Catalog;
use stagehand_core::config::Config;
use stagehand_core::hook::{HookInput, HookResult};
use stagehand_core::orchestrate;
use std::io::Read;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum HookSubcommand {
    /// UserPromptSubmit: classify the prompt and emit agent directives
    Prompt,
    /// UserPromptSubmit: evaluate context budget and emit pruning advice
    Context,
    /// UserPromptSubmit: capture decision/preference statements
    Capture,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run a hook against JSON input on stdin and print exactly one JSON result.
///
/// This is the host-facing boundary: it is deliberately infallible. Whatever
/// goes wrong inside, the host sees a well-formed silent success and exit 0.
pub fn run(root: &Path, subcmd: HookSubcommand) {
    let result = evaluate(root, &subcmd);
    // HookResult serialization cannot fail for these shapes; the fallback
    // string keeps the contract airtight anyway.
    let json = serde_json::to_string(&result)
        .unwrap_or_else(|_| "{\"continue\":true}".to_string());
    println!("{json}");
}

fn evaluate(root: &Path, subcmd: &HookSubcommand) -> HookResult {
    let mut buf = String::new();
    if std::io::stdin().read_to_string(&mut buf).is_err() {
        return HookResult::silent();
    }
    let input = HookInput::from_json(&buf);
    let root = input.project_dir.clone().unwrap_or_else(|| root.to_path_buf());
    let config = Config::load(&root).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config unreadable, using defaults");
        Config::default()
    });
    let now = chrono::Utc::now();

    match subcmd {
        HookSubcommand::Prompt => orchestrate::orchestrate(
            &root,
            &input,
            &config.orchestration,
            Catalog::builtin(),
            now,
        ),
        HookSubcommand::Context => advisor::advise_hook(&root, &input, &config.advisor, now),
        HookSubcommand::Capture => capture::capture(&root, &input, now),
    }
}
