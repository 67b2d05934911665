//! Session-scoped orchestration state.
//!
//! One JSON file per session id holds the prompt history ring buffer, the
//! dispatched-agent cooldown map, and the last cached classification. Every
//! hook invocation is a fresh process, so each call is a full
//! load → mutate → save cycle. Absent or corrupt files read as fresh state;
//! a torn write from a crashed invocation must never fail the current one.

use crate::classifier::{CalibrationAdjustment, ClassificationResult, PromptHistoryEntry};
use crate::config::OrchestrationConfig;
use crate::error::Result;
use crate::{io, paths};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// DispatchRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRecord {
    pub confidence: u32,
    pub dispatched_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub prompt_history: Vec<PromptHistoryEntry>,
    /// BTreeMap keeps serialized output stable across runs.
    #[serde(default)]
    pub dispatched_agents: BTreeMap<String, DispatchRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_classification: Option<ClassificationResult>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            ..Self::default()
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Load the state file for `session_id`, lazily initializing when the
    /// file is absent or unparseable.
    pub fn load(root: &Path, session_id: &str) -> Self {
        let path = paths::session_state_path(root, session_id);
        match io::load_json_or_default::<SessionState>(&path) {
            Some(mut state) => {
                state.session_id = session_id.to_string();
                state
            }
            None => Self::new(session_id),
        }
    }

    /// Atomically persist, lazily dropping expired dispatch records.
    pub fn save(&mut self, root: &Path, config: &OrchestrationConfig, now: DateTime<Utc>) -> Result<()> {
        let cooldown = Duration::minutes(config.cooldown_minutes);
        self.dispatched_agents
            .retain(|_, record| now - record.dispatched_at < cooldown);
        self.updated_at = Some(now);
        let path = paths::session_state_path(root, &self.session_id);
        let data = serde_json::to_vec_pretty(self)?;
        io::atomic_write(&path, &data)
    }

    // -----------------------------------------------------------------------
    // Prompt history
    // -----------------------------------------------------------------------

    /// Append a prompt to the history ring. Text is truncated at a char
    /// boundary; the oldest entry is dropped silently on overflow.
    pub fn push_prompt(&mut self, text: &str, config: &OrchestrationConfig, now: DateTime<Utc>) {
        self.prompt_history.push(PromptHistoryEntry {
            text: truncate_at_boundary(text, config.prompt_truncate).to_string(),
            timestamp: now,
        });
        if self.prompt_history.len() > config.history_cap {
            let excess = self.prompt_history.len() - config.history_cap;
            self.prompt_history.drain(..excess);
        }
    }

    // -----------------------------------------------------------------------
    // Dispatch cooldown
    // -----------------------------------------------------------------------

    pub fn is_dispatched(&self, agent: &str, config: &OrchestrationConfig, now: DateTime<Utc>) -> bool {
        self.dispatched_agents
            .get(agent)
            .map(|record| now - record.dispatched_at < Duration::minutes(config.cooldown_minutes))
            .unwrap_or(false)
    }

    pub fn track_dispatch(&mut self, agent: &str, confidence: u32, now: DateTime<Utc>) {
        self.dispatched_agents.insert(
            agent.to_string(),
            DispatchRecord {
                confidence,
                dispatched_at: now,
            },
        );
    }

    /// Agents currently on cooldown, for the classifier's dispatch gate.
    pub fn agents_on_cooldown(&self, config: &OrchestrationConfig, now: DateTime<Utc>) -> Vec<String> {
        self.dispatched_agents
            .iter()
            .filter(|(_, record)| now - record.dispatched_at < Duration::minutes(config.cooldown_minutes))
            .map(|(agent, _)| agent.clone())
            .collect()
    }

    pub fn cache_classification(&mut self, result: &ClassificationResult) {
        self.cached_classification = Some(result.clone());
    }
}

// ---------------------------------------------------------------------------
// Calibration
// ---------------------------------------------------------------------------

/// Load the global calibration map (agent → signed delta), written by an
/// external learning process. Absent or corrupt reads as no adjustments.
pub fn load_calibration(root: &Path) -> Vec<CalibrationAdjustment> {
    let path = paths::calibration_path(root);
    io::load_json_or_default::<BTreeMap<String, i32>>(&path)
        .map(|map| {
            map.into_iter()
                .map(|(agent, delta)| CalibrationAdjustment { agent, delta })
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Truncation
// ---------------------------------------------------------------------------

/// Longest prefix of `s` that is ≤ `max_bytes` and doesn't split a char.
fn truncate_at_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
