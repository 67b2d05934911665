use stagehand_core::catalog::Catalog;
use stagehand_core::classifier;
use stagehand_core::config::Config;
use stagehand_core::session::{self, SessionState};
use std::path::Path;

/// Debug view of the classifier: score a prompt exactly as the prompt hook
/// would, optionally with a session's history and cooldowns applied.
pub fn run(root: &Path, prompt: &str, session_id: Option<&str>) -> anyhow::Result<()> {
    let config = Config::load(root)?;
    let adjustments = session::load_calibration(root);
    let now = chrono::Utc::now();

    let (history, on_cooldown) = match session_id {
        Some(id) => {
            stagehand_core::paths::validate_session_id(id)?;
            let state = SessionState::load(root, id);
            let cooldown = state.agents_on_cooldown(&config.orchestration, now);
            (state.prompt_history, cooldown)
        }
        None => (Vec::new(), Vec::new()),
    };

    let result = classifier::classify(
        Catalog::builtin(),
        prompt,
        &history,
        &adjustments,
        &on_cooldown,
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
