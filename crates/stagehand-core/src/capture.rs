//! Decision and preference capture.
//!
//! Scans prompts for decision-shaped statements ("we decided", "always use")
//! and appends structured records to append-only JSONL logs: `decisions.jsonl`
//! for the local record and `graph-queue.jsonl` for the downstream knowledge
//! graph sync. Everything here is best-effort; a failed write is logged and
//! swallowed so the hook chain never breaks.

use crate::advisor::extract_keywords;
use crate::error::Result;
use crate::hook::{HookInput, HookResult};
use crate::{io, paths};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureCategory {
    Decision,
    Preference,
    Pattern,
}

const DECISION_MARKERS: &[&str] = &[
    "we decided",
    "decided to",
    "going with",
    "let's use",
    "lets use",
    "settled on",
    "we'll use",
];

const PREFERENCE_MARKERS: &[&str] = &[
    "i prefer",
    "always use",
    "never use",
    "from now on",
    "by default use",
];

const PATTERN_MARKERS: &[&str] = &["convention", "standard practice", "as a rule", "our pattern"];

/// Classify a prompt as capture-worthy, or not. First category whose marker
/// appears wins; decisions outrank preferences outrank patterns.
pub fn detect_capture(prompt: &str) -> Option<CaptureCategory> {
    let lower = prompt.to_lowercase();
    let tables: &[(&[&str], CaptureCategory)] = &[
        (DECISION_MARKERS, CaptureCategory::Decision),
        (PREFERENCE_MARKERS, CaptureCategory::Preference),
        (PATTERN_MARKERS, CaptureCategory::Pattern),
    ];
    for (markers, category) in tables {
        if markers.iter().any(|m| lower.contains(m)) {
            return Some(*category);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRecord {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub category: CaptureCategory,
    pub text: String,
    pub keywords: Vec<String>,
}

/// A sync instruction for the external knowledge-graph backend. Only queued
/// here; the consumer drains the queue out of process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQueueEntry {
    pub timestamp: DateTime<Utc>,
    pub op: String,
    pub category: CaptureCategory,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Hook entry point
// ---------------------------------------------------------------------------

/// Run the capture hook. Always returns silent success; capture is a side
/// effect, never a directive.
pub fn capture(root: &Path, input: &HookInput, now: DateTime<Utc>) -> HookResult {
    if let Some(category) = detect_capture(&input.prompt) {
        if let Err(e) = append_records(root, input, category, now) {
            tracing::warn!(error = %e, "decision capture write failed");
        }
    }
    HookResult::silent()
}

fn append_records(
    root: &Path,
    input: &HookInput,
    category: CaptureCategory,
    now: DateTime<Utc>,
) -> Result<()> {
    let record = DecisionRecord {
        timestamp: now,
        session_id: input.session_id.clone(),
        category,
        text: input.prompt.clone(),
        keywords: extract_keywords(&input.prompt),
    };
    io::append_jsonl(&paths::decisions_path(root), &record)?;
    io::append_jsonl(
        &paths::graph_queue_path(root),
        &GraphQueueEntry {
            timestamp: now,
            op: "add_node".to_string(),
            category,
            text: input.prompt.clone(),
        },
    )?;
    Ok(())
}

/// Read back captured decisions, skipping malformed lines.
pub fn load_decisions(root: &Path) -> Result<Vec<DecisionRecord>> {
    io::read_jsonl(&paths::decisions_path(root))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
