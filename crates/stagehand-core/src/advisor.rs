//! Context-budget pruning advisor.
//!
//! Scores every loaded context item on recency + frequency + relevance
//! (0-30 composite) once aggregate usage crosses the trigger ratio, and
//! recommends the lowest-value items for eviction. Above the critical ratio
//! the per-item pass is skipped entirely in favor of an immediate compaction
//! directive.

use crate::config::AdvisorConfig;
use crate::error::Result;
use crate::{io, paths};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// ContextItem / ContextState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextItem {
    /// Typed id: `skill:`, `file:`, or `agent:` prefix.
    pub id: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub last_accessed: DateTime<Utc>,
    pub loaded_at: DateTime<Utc>,
    #[serde(default)]
    pub access_count: u32,
    #[serde(default)]
    pub estimated_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContextState {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_context_tokens: u64,
    #[serde(default)]
    pub context_budget: u64,
    #[serde(default)]
    pub items: Vec<ContextItem>,
}

impl ContextState {
    pub fn new(session_id: &str, budget: u64) -> Self {
        Self {
            session_id: session_id.to_string(),
            context_budget: budget,
            ..Self::default()
        }
    }

    /// Load the per-session state file, lazily initializing on absence or
    /// corruption. A missing budget falls back to the configured default.
    pub fn load(root: &Path, session_id: &str, config: &AdvisorConfig) -> Self {
        let path = paths::context_state_path(root, session_id);
        let mut state = io::load_json_or_default::<ContextState>(&path)
            .unwrap_or_else(|| Self::new(session_id, config.context_budget));
        state.session_id = session_id.to_string();
        if state.context_budget == 0 {
            state.context_budget = config.context_budget;
        }
        state
    }

    pub fn save(&mut self, root: &Path, now: DateTime<Utc>) -> Result<()> {
        self.updated_at = Some(now);
        let path = paths::context_state_path(root, &self.session_id);
        let data = serde_json::to_vec_pretty(self)?;
        io::atomic_write(&path, &data)
    }

    /// Record a load or re-reference of a context item. Access counts only
    /// ever go up within a session.
    pub fn touch<I>(&mut self, id: &str, estimated_tokens: u64, tags: I, now: DateTime<Utc>)
    where
        I: IntoIterator<Item = String>,
    {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.access_count += 1;
                item.last_accessed = now;
            }
            None => {
                self.items.push(ContextItem {
                    id: id.to_string(),
                    tags: tags.into_iter().collect(),
                    last_accessed: now,
                    loaded_at: now,
                    access_count: 1,
                    estimated_tokens,
                });
                self.total_context_tokens += estimated_tokens;
            }
        }
    }

    pub fn usage_ratio(&self) -> f64 {
        if self.context_budget == 0 {
            return 0.0;
        }
        self.total_context_tokens as f64 / self.context_budget as f64
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Recency bucket over minutes since last access.
pub fn recency_score(minutes: i64) -> u32 {
    match minutes {
        m if m <= 5 => 10,
        m if m <= 15 => 8,
        m if m <= 30 => 6,
        m if m <= 60 => 4,
        m if m <= 120 => 2,
        _ => 0,
    }
}

pub fn frequency_score(access_count: u32) -> u32 {
    match access_count {
        c if c >= 10 => 10,
        c if c >= 7 => 8,
        c if c >= 4 => 6,
        c if c >= 2 => 4,
        c if c >= 1 => 2,
        _ => 0,
    }
}

/// Tag-overlap relevance, bucketed. Items with no tags (and prompts with no
/// keywords) score a floor of 2: generic infrastructure, not irrelevant.
pub fn relevance_score(tags: &BTreeSet<String>, keywords: &[String]) -> u32 {
    if tags.is_empty() || keywords.is_empty() {
        return 2;
    }
    let overlap = tags.iter().filter(|t| keywords.contains(t)).count();
    let ratio = overlap as f64 / tags.len() as f64;
    if ratio >= 0.75 {
        10
    } else if ratio >= 0.50 {
        8
    } else if ratio >= 0.30 {
        6
    } else if ratio >= 0.15 {
        4
    } else if ratio > 0.0 {
        2
    } else {
        0
    }
}

pub fn composite_score(item: &ContextItem, keywords: &[String], now: DateTime<Utc>) -> u32 {
    let minutes = (now - item.last_accessed).num_minutes();
    recency_score(minutes) + frequency_score(item.access_count) + relevance_score(&item.tags, keywords)
}

// ---------------------------------------------------------------------------
// Keyword extraction
// ---------------------------------------------------------------------------

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "this", "that", "from", "have", "has", "was", "were", "are",
    "you", "your", "not", "can", "will", "how", "what", "when", "where", "why", "all", "use",
    "using", "need", "help", "want", "about", "into", "please", "make", "some", "just", "like",
];

const MAX_KEYWORDS: usize = 20;

/// Lowercased word tokens of ≥3 chars, stopwords dropped, first 20 kept in
/// order of appearance.
pub fn extract_keywords(prompt: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for token in prompt
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 3)
        .filter(|t| !STOPWORDS.contains(t))
    {
        if !seen.iter().any(|s| s == token) {
            seen.push(token.to_string());
            if seen.len() == MAX_KEYWORDS {
                break;
            }
        }
    }
    seen
}

// ---------------------------------------------------------------------------
// Advice
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrunePriority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneCandidate {
    pub id: String,
    pub score: u32,
    pub estimated_tokens: u64,
    pub priority: PrunePriority,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Advice {
    /// Usage below the trigger ratio; nothing scored, nothing said.
    Silent,
    /// Scored pass produced pruning recommendations.
    Recommendations { message: String, candidates: Vec<PruneCandidate> },
    /// Usage at or above the critical ratio; scoring skipped.
    Critical { message: String },
}

/// Threshold below which a candidate is flagged high priority.
const HIGH_PRIORITY_SCORE: u32 = 8;

/// Evaluate the context state against the current prompt.
pub fn advise(state: &ContextState, prompt: &str, config: &AdvisorConfig, now: DateTime<Utc>) -> Advice {
    let ratio = state.usage_ratio();
    if ratio >= config.critical_ratio {
        return Advice::Critical {
            message: critical_message(state, ratio),
        };
    }
    if ratio < config.trigger_ratio {
        return Advice::Silent;
    }

    let keywords = extract_keywords(prompt);
    let mut candidates: Vec<PruneCandidate> = state
        .items
        .iter()
        .map(|item| (item, composite_score(item, &keywords, now)))
        .filter(|(_, score)| *score <= config.prune_threshold)
        .map(|(item, score)| PruneCandidate {
            id: item.id.clone(),
            score,
            estimated_tokens: item.estimated_tokens,
            priority: if score <= HIGH_PRIORITY_SCORE {
                PrunePriority::High
            } else {
                PrunePriority::Medium
            },
        })
        .collect();

    if candidates.is_empty() {
        return Advice::Silent;
    }

    // Lowest-value first; ties by id for a stable ordering.
    candidates.sort_by(|a, b| a.score.cmp(&b.score).then_with(|| a.id.cmp(&b.id)));
    candidates.truncate(config.max_recommendations);

    Advice::Recommendations {
        message: recommendation_message(state, ratio, &candidates),
        candidates,
    }
}

/// Run the advisor as a hook: load the session's context state and evaluate
/// it against the prompt. Read-only; item tracking happens through `touch`.
/// Internal errors degrade to silent success like every other hook.
pub fn advise_hook(
    root: &Path,
    input: &crate::hook::HookInput,
    config: &AdvisorConfig,
    now: DateTime<Utc>,
) -> crate::hook::HookResult {
    use crate::hook::{HookResult, EVENT_USER_PROMPT};
    if paths::validate_session_id(&input.session_id).is_err() {
        return HookResult::silent();
    }
    let state = ContextState::load(root, &input.session_id, config);
    match advise(&state, &input.prompt, config, now) {
        Advice::Silent => HookResult::silent(),
        Advice::Recommendations { message, .. } | Advice::Critical { message } => {
            HookResult::with_context(EVENT_USER_PROMPT, message)
        }
    }
}

fn critical_message(state: &ContextState, ratio: f64) -> String {
    format!(
        "**Context critical: {:.0}% of budget used** ({} / {} tokens). \
         Compact the conversation now; per-item pruning will not recover enough.",
        ratio * 100.0,
        state.total_context_tokens,
        state.context_budget
    )
}

fn recommendation_message(state: &ContextState, ratio: f64, candidates: &[PruneCandidate]) -> String {
    let savings: u64 = candidates.iter().map(|c| c.estimated_tokens).sum();
    let mut doc = format!(
        "**Context usage at {:.0}%** ({} / {} tokens). Pruning candidates, least valuable first:\n",
        ratio * 100.0,
        state.total_context_tokens,
        state.context_budget
    );
    for (i, c) in candidates.iter().enumerate() {
        let tag = match c.priority {
            PrunePriority::High => " (high priority)",
            PrunePriority::Medium => "",
        };
        doc.push_str(&format!(
            "{}. `{}` — score {}/30, ~{} tokens{tag}\n",
            i + 1,
            c.id,
            c.score,
            c.estimated_tokens
        ));
    }
    doc.push_str(&format!("Potential savings: ~{savings} tokens.\n"));
    doc
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tags(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn item(id: &str, minutes_ago: i64, access_count: u32, tags: BTreeSet<String>, tokens: u64) -> ContextItem {
        let now = Utc::now();
        ContextItem {
            id: id.to_string(),
            tags,
            last_accessed: now - Duration::minutes(minutes_ago),
            loaded_at: now - Duration::minutes(minutes_ago + 1),
            access_count,
            estimated_tokens: tokens,
        }
    }

    fn state_with(items: Vec<ContextItem>, used: u64, budget: u64) -> ContextState {
        ContextState {
            session_id: "s1".to_string(),
            updated_at: None,
            total_context_tokens: used,
            context_budget: budget,
            items,
        }
    }

    #[test]
    fn recency_buckets() {
        assert_eq!(recency_score(3), 10);
        assert_eq!(recency_score(10), 8);
        assert_eq!(recency_score(25), 6);
        assert_eq!(recency_score(45), 4);
        assert_eq!(recency_score(90), 2);
        assert_eq!(recency_score(500), 0);
    }

    #[test]
    fn frequency_is_monotone_in_access_count() {
        let mut last = 0;
        for count in 0..=10 {
            let score = frequency_score(count);
            assert!(score >= last, "frequency dipped at count {count}");
            last = score;
        }
        assert_eq!(frequency_score(0), 0);
        assert_eq!(frequency_score(1), 2);
        assert_eq!(frequency_score(2), 4);
        assert_eq!(frequency_score(4), 6);
        assert_eq!(frequency_score(7), 8);
        assert_eq!(frequency_score(10), 10);
    }

    #[test]
    fn relevance_empty_sets_default_to_floor() {
        assert_eq!(relevance_score(&tags(&[]), &["auth".to_string()]), 2);
        assert_eq!(relevance_score(&tags(&["auth"]), &[]), 2);
    }

    #[test]
    fn relevance_buckets() {
        let keywords = vec!["auth".to_string(), "login".to_string()];
        assert_eq!(relevance_score(&tags(&["auth", "login"]), &keywords), 10);
        assert_eq!(relevance_score(&tags(&["auth", "other"]), &keywords), 8);
        assert_eq!(relevance_score(&tags(&["auth", "a", "b"]), &keywords), 6);
        assert_eq!(
            relevance_score(&tags(&["auth", "a", "b", "c", "d", "e"]), &keywords),
            4
        );
        assert_eq!(relevance_score(&tags(&["x", "y"]), &keywords), 0);
    }

    #[test]
    fn hot_item_is_not_a_candidate() {
        // recency 10 + frequency 8 + relevance 10 = 28.
        let it = item("skill:auth-review", 3, 8, tags(&["auth", "login"]), 4000);
        let keywords = extract_keywords("fix the auth login flow");
        assert_eq!(composite_score(&it, &keywords, Utc::now()), 28);
    }

    #[test]
    fn cold_item_is_high_priority() {
        // recency 0 + frequency 2 + relevance 0 = 2.
        let it = item("file:old-notes.md", 150, 1, tags(&["unrelated"]), 3000);
        let keywords = extract_keywords("fix the auth login flow");
        let score = composite_score(&it, &keywords, Utc::now());
        assert_eq!(score, 2);

        let state = state_with(vec![it], 150_000, 200_000);
        let advice = advise(&state, "fix the auth login flow", &AdvisorConfig::default(), Utc::now());
        match advice {
            Advice::Recommendations { candidates, .. } => {
                assert_eq!(candidates.len(), 1);
                assert_eq!(candidates[0].priority, PrunePriority::High);
            }
            other => panic!("expected recommendations, got {other:?}"),
        }
    }

    #[test]
    fn below_trigger_is_silent() {
        let it = item("file:old.md", 300, 0, tags(&[]), 1000);
        let state = state_with(vec![it], 100_000, 200_000);
        let advice = advise(&state, "anything", &AdvisorConfig::default(), Utc::now());
        assert_eq!(advice, Advice::Silent);
    }

    #[test]
    fn critical_bypasses_scoring() {
        // An item that would score as a candidate must not appear: the
        // critical path skips the per-item pass entirely.
        let it = item("file:old.md", 300, 0, tags(&[]), 1000);
        let state = state_with(vec![it], 192_000, 200_000);
        let advice = advise(&state, "anything", &AdvisorConfig::default(), Utc::now());
        match advice {
            Advice::Critical { message } => {
                assert!(message.contains("96%"));
                assert!(!message.contains("file:old.md"));
            }
            other => panic!("expected critical, got {other:?}"),
        }
    }

    #[test]
    fn candidates_ranked_ascending_and_capped() {
        let items: Vec<ContextItem> = (0..8)
            .map(|i| item(&format!("file:f{i}.md"), 300, i, tags(&[]), 1000))
            .collect();
        let state = state_with(items, 150_000, 200_000);
        let config = AdvisorConfig::default();
        let advice = advise(&state, "unrelated prompt text", &config, Utc::now());
        match advice {
            Advice::Recommendations { candidates, message } => {
                assert_eq!(candidates.len(), config.max_recommendations);
                assert!(candidates.windows(2).all(|w| w[0].score <= w[1].score));
                assert!(message.contains("Potential savings: ~5000 tokens"));
            }
            other => panic!("expected recommendations, got {other:?}"),
        }
    }

    #[test]
    fn well_scored_items_leave_advice_silent() {
        let it = item("skill:auth-review", 3, 8, tags(&["auth", "login"]), 4000);
        let state = state_with(vec![it], 150_000, 200_000);
        let advice = advise(&state, "fix the auth login flow", &AdvisorConfig::default(), Utc::now());
        assert_eq!(advice, Advice::Silent);
    }

    #[test]
    fn keyword_extraction_rules() {
        let keywords = extract_keywords("How can I fix the Auth-Login flow in auth.rs?");
        assert_eq!(keywords[0], "fix");
        assert!(keywords.contains(&"auth".to_string()));
        assert!(keywords.contains(&"login".to_string()));
        // Stopwords and short tokens gone, duplicates collapsed.
        assert!(!keywords.contains(&"how".to_string()));
        assert!(!keywords.contains(&"the".to_string()));
        assert_eq!(keywords.iter().filter(|k| *k == "auth").count(), 1);
    }

    #[test]
    fn keyword_extraction_caps_at_twenty() {
        let prompt: String = (0..40).map(|i| format!("word{i:02} ")).collect();
        assert_eq!(extract_keywords(&prompt).len(), 20);
    }

    #[test]
    fn touch_creates_then_increments() {
        let now = Utc::now();
        let mut state = ContextState::new("s1", 200_000);
        state.touch("skill:git-workflow", 2500, vec!["git".to_string()], now);
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].access_count, 1);
        assert_eq!(state.total_context_tokens, 2500);

        state.touch("skill:git-workflow", 2500, Vec::<String>::new(), now + Duration::minutes(1));
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].access_count, 2);
        // Re-references don't double-count tokens.
        assert_eq!(state.total_context_tokens, 2500);
    }

    #[test]
    fn corrupt_state_file_reads_as_fresh() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = paths::context_state_path(dir.path(), "s1");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{\"items\": [{]}").unwrap();
        let state = ContextState::load(dir.path(), "s1", &AdvisorConfig::default());
        assert!(state.items.is_empty());
        assert_eq!(state.context_budget, 200_000);
    }

    #[test]
    fn state_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let now = Utc::now();
        let mut state = ContextState::new("s1", 200_000);
        state.touch("file:src/main.rs", 1200, vec!["rust".to_string()], now);
        state.save(dir.path(), now).unwrap();

        let loaded = ContextState::load(dir.path(), "s1", &AdvisorConfig::default());
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].id, "file:src/main.rs");
        assert_eq!(loaded.total_context_tokens, 1200);
    }
}
