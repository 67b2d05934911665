//! Orchestrator hook policy.
//!
//! Glue between the pure classifier and the host: load session state, score
//! the prompt, pick exactly one response tier, persist state, and build the
//! host directive. Any internal failure degrades to silent success; nothing
//! here may propagate an error to the host's dispatch loop.

use crate::catalog::{Catalog, STRONG_RECOMMEND, SUGGEST};
use crate::classifier::{self, ClassificationResult, TargetMatch};
use crate::config::OrchestrationConfig;
use crate::error::Result;
use crate::hook::{HookInput, HookResult, EVENT_USER_PROMPT};
use crate::session::{self, SessionState};
use crate::paths;
use chrono::{DateTime, Utc};
use std::path::Path;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run the orchestration hook for one user prompt.
pub fn orchestrate(
    root: &Path,
    input: &HookInput,
    config: &OrchestrationConfig,
    catalog: &Catalog,
    now: DateTime<Utc>,
) -> HookResult {
    match run(root, input, config, catalog, now) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "orchestration degraded to silent success");
            HookResult::silent()
        }
    }
}

fn run(
    root: &Path,
    input: &HookInput,
    config: &OrchestrationConfig,
    catalog: &Catalog,
    now: DateTime<Utc>,
) -> Result<HookResult> {
    paths::validate_session_id(&input.session_id)?;
    if !classifier::should_classify(&input.prompt) {
        return Ok(HookResult::silent());
    }

    let mut state = SessionState::load(root, &input.session_id);
    let adjustments = session::load_calibration(root);
    let on_cooldown = state.agents_on_cooldown(config, now);

    let result = classifier::classify(
        catalog,
        &input.prompt,
        &state.prompt_history,
        &adjustments,
        &on_cooldown,
    );

    state.push_prompt(&input.prompt, config, now);
    state.cache_classification(&result);

    let response = decide(&result, &mut state, now);

    // State must land even when the response is silent: history context for
    // the next prompt depends on it.
    state.save(root, config, now)?;

    Ok(response)
}

// ---------------------------------------------------------------------------
// Tier decision
// ---------------------------------------------------------------------------

/// Pick exactly one of {auto-dispatch, recommend, suggest, silent}.
fn decide(result: &ClassificationResult, state: &mut SessionState, now: DateTime<Utc>) -> HookResult {
    if let Some(top) = result.top_agent() {
        if result.should_auto_dispatch {
            state.track_dispatch(&top.target, top.confidence, now);
            return HookResult::with_context(EVENT_USER_PROMPT, build_auto_dispatch(top));
        }
        // Secondary "alternative agent" notes belong to the softer tiers
        // only; an auto-dispatch directive stays single-voiced.
        let alternative = result.agents.get(1).filter(|alt| alt.confidence >= SUGGEST);
        // An agent over the dispatch threshold but on cooldown degrades to a
        // recommendation; re-dispatch spam is worse than a softer nudge.
        if top.confidence >= STRONG_RECOMMEND {
            return HookResult::with_context(
                EVENT_USER_PROMPT,
                build_recommendation(top, alternative),
            );
        }
        if top.confidence >= SUGGEST {
            return HookResult::with_context(
                EVENT_USER_PROMPT,
                build_suggestion(top, result.skills.first()),
            );
        }
    }

    if let Some(skill) = result.skills.first() {
        if skill.confidence >= SUGGEST {
            return HookResult::with_context(EVENT_USER_PROMPT, build_skill_note(skill));
        }
    }

    HookResult::silent()
}

// ---------------------------------------------------------------------------
// Message builders
// ---------------------------------------------------------------------------

fn build_auto_dispatch(top: &TargetMatch) -> String {
    let mut doc = String::new();
    doc.push_str(&format!(
        "**Dispatch the `{}` agent for this request** (confidence {}).\n\n",
        top.target, top.confidence
    ));
    doc.push_str(&format!("{}.\n", top.description));
    doc.push_str(&format!(
        "Matched: {}.\n",
        top.matched_keywords.join(", ")
    ));
    doc.push_str(&format!(
        "Use the Task tool with subagent type `{}` before answering directly.\n",
        top.target
    ));
    doc
}

fn build_recommendation(top: &TargetMatch, alternative: Option<&TargetMatch>) -> String {
    let mut doc = String::new();
    doc.push_str(&format!(
        "**Recommended agent: `{}`** (confidence {}).\n\n",
        top.target, top.confidence
    ));
    doc.push_str(&format!(
        "{}. Consider delegating this request to it.\n",
        top.description
    ));
    if let Some(alt) = alternative {
        doc.push_str(&format!(
            "Alternative: `{}` (confidence {}).\n",
            alt.target, alt.confidence
        ));
    }
    doc
}

fn build_suggestion(top: &TargetMatch, skill: Option<&TargetMatch>) -> String {
    let mut doc = String::new();
    doc.push_str(&format!(
        "The `{}` agent may help here (confidence {}): {}.\n",
        top.target, top.confidence, top.description
    ));
    if let Some(skill) = skill {
        doc.push_str(&format!(
            "The `{}` skill is also relevant: {}.\n",
            skill.target, skill.description
        ));
    }
    doc
}

fn build_skill_note(skill: &TargetMatch) -> String {
    format!(
        "The `{}` skill fits this request (confidence {}): {}.\n",
        skill.target, skill.confidence, skill.description
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn input(prompt: &str) -> HookInput {
        HookInput {
            prompt: prompt.to_string(),
            session_id: "sess-1".to_string(),
            project_dir: None,
        }
    }

    fn run_hook(root: &Path, prompt: &str, now: DateTime<Utc>) -> HookResult {
        orchestrate(
            root,
            &input(prompt),
            &OrchestrationConfig::default(),
            Catalog::builtin(),
            now,
        )
    }

    fn context_of(result: &HookResult) -> &str {
        result
            .hook_specific_output
            .as_ref()
            .map(|o| o.additional_context.as_str())
            .unwrap_or("")
    }

    #[test]
    fn trivial_prompt_is_silent_and_stateless() {
        let dir = TempDir::new().unwrap();
        let result = run_hook(dir.path(), "/compact", Utc::now());
        assert_eq!(result, HookResult::silent());
        assert!(!paths::session_state_path(dir.path(), "sess-1").exists());
    }

    #[test]
    fn invalid_session_id_is_silent() {
        let dir = TempDir::new().unwrap();
        let result = orchestrate(
            dir.path(),
            &HookInput {
                prompt: "run a security audit now".to_string(),
                session_id: "../escape".to_string(),
                project_dir: None,
            },
            &OrchestrationConfig::default(),
            Catalog::builtin(),
            Utc::now(),
        );
        assert_eq!(result, HookResult::silent());
    }

    #[test]
    fn high_confidence_emits_auto_dispatch_once() {
        let dir = TempDir::new().unwrap();
        let now = Utc::now();

        let first = run_hook(dir.path(), "run a security audit on the session tokens", now);
        let ctx = context_of(&first).to_string();
        assert!(ctx.contains("Dispatch the `security-auditor` agent"));

        // Same prompt again: cooldown degrades to a recommendation, never a
        // second dispatch directive.
        let second = run_hook(dir.path(), "run a security audit on the session tokens", now);
        let ctx = context_of(&second);
        assert!(!ctx.contains("Dispatch the"));
        assert!(ctx.contains("Recommended agent: `security-auditor`"));
    }

    #[test]
    fn dispatch_is_tracked_in_state() {
        let dir = TempDir::new().unwrap();
        let now = Utc::now();
        run_hook(dir.path(), "run a security audit on the session tokens", now);

        let state = SessionState::load(dir.path(), "sess-1");
        assert!(state.dispatched_agents.contains_key("security-auditor"));
        assert_eq!(state.prompt_history.len(), 1);
        assert!(state.cached_classification.is_some());
    }

    #[test]
    fn mid_confidence_suggests_without_dispatch() {
        let dir = TempDir::new().unwrap();
        let result = run_hook(dir.path(), "something about the frontend layout", Utc::now());
        let ctx = context_of(&result);
        assert!(ctx.contains("frontend-ui-developer"));
        assert!(!ctx.contains("Dispatch the"));

        let state = SessionState::load(dir.path(), "sess-1");
        assert!(state.dispatched_agents.is_empty());
    }

    #[test]
    fn unmatched_prompt_is_silent_but_recorded() {
        let dir = TempDir::new().unwrap();
        let result = run_hook(dir.path(), "hello there friend", Utc::now());
        assert_eq!(result, HookResult::silent());

        let state = SessionState::load(dir.path(), "sess-1");
        assert_eq!(state.prompt_history.len(), 1);
    }

    #[test]
    fn skill_only_match_emits_skill_note() {
        let dir = TempDir::new().unwrap();
        let result = run_hook(dir.path(), "walk me through a rebase onto main", Utc::now());
        let ctx = context_of(&result);
        assert!(ctx.contains("`git-workflow` skill"));
    }

    #[test]
    fn auto_dispatch_carries_no_alternative_note() {
        let dir = TempDir::new().unwrap();
        let result = run_hook(
            dir.path(),
            "design the new api and tune the slow database query",
            Utc::now(),
        );
        let ctx = context_of(&result);
        // Exactly one directive and nothing else, even with a strong runner-up.
        assert_eq!(ctx.matches("Dispatch the").count(), 1);
        assert!(!ctx.contains("Alternative: `"));
    }

    #[test]
    fn recommendation_appends_alternative_agent_note() {
        let dir = TempDir::new().unwrap();
        let result = run_hook(
            dir.path(),
            "fix the database schema and the frontend layout",
            Utc::now(),
        );
        let ctx = context_of(&result);
        assert!(ctx.contains("Recommended agent: `database-specialist`"));
        assert!(ctx.contains("Alternative: `frontend-ui-developer`"));
        assert!(!ctx.contains("Dispatch the"));
    }
}
