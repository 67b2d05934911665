//! Prompt-intent classification.
//!
//! `classify` is a pure function of its inputs: no I/O, no clock, no
//! environment. It scores a prompt against the static catalog, applies
//! negation suppression and calibration deltas, and ranks candidates into
//! agent and skill lists. State (history, cooldowns, calibration) is loaded
//! by the caller and passed in.

use crate::catalog::{Catalog, TargetKind, AUTO_DISPATCH, SUGGEST};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptHistoryEntry {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationAdjustment {
    pub agent: String,
    pub delta: i32,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetMatch {
    pub target: String,
    /// 0-100 after boosts, discounts, and calibration.
    pub confidence: u32,
    pub matched_keywords: Vec<String>,
    pub signals: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub intent: String,
    pub agents: Vec<TargetMatch>,
    pub skills: Vec<TargetMatch>,
    pub should_auto_dispatch: bool,
}

impl ClassificationResult {
    pub fn empty(intent: &str) -> Self {
        Self {
            intent: intent.to_string(),
            agents: Vec::new(),
            skills: Vec::new(),
            should_auto_dispatch: false,
        }
    }

    pub fn top_agent(&self) -> Option<&TargetMatch> {
        self.agents.first()
    }
}

// ---------------------------------------------------------------------------
// Tunables
// ---------------------------------------------------------------------------

/// Score added when the same target matched in recent history.
const HISTORY_BOOST: u32 = 10;
/// How many history entries count as "recent" for the sustained-topic signal.
const HISTORY_WINDOW: usize = 3;
/// Negated matches keep a quarter of their confidence.
const NEGATION_DIVISOR: u32 = 4;
/// Tokens scanned backwards from a match for a negation marker.
const NEGATION_TOKEN_WINDOW: usize = 3;

const NEGATION_MARKERS: &[&str] = &[
    "don't", "dont", "not", "no", "never", "without", "avoid", "skip", "won't", "wont",
];

// ---------------------------------------------------------------------------
// Pre-filter
// ---------------------------------------------------------------------------

/// Cheap gate before full classification. Misses cost a suggestion, so err
/// toward classifying; only plainly trivial prompts are filtered.
pub fn should_classify(prompt: &str) -> bool {
    let trimmed = prompt.trim();
    if trimmed.is_empty() || trimmed.starts_with('/') {
        return false;
    }
    trimmed.split_whitespace().nth(1).is_some()
}

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

struct Candidate {
    confidence: u32,
    kind: TargetKind,
    matched_keywords: Vec<String>,
    signals: Vec<String>,
}

/// Score `prompt` against the catalog.
///
/// `dispatched` lists agents currently on cooldown; it only gates the
/// `should_auto_dispatch` flag, never the ranking itself. Never panics for
/// any input; empty prompt yields an empty result.
pub fn classify(
    catalog: &Catalog,
    prompt: &str,
    history: &[PromptHistoryEntry],
    adjustments: &[CalibrationAdjustment],
    dispatched: &[String],
) -> ClassificationResult {
    let intent = catalog.intent_of(prompt);
    if prompt.trim().is_empty() {
        return ClassificationResult::empty(intent);
    }

    let mut candidates: HashMap<&str, Candidate> = HashMap::new();

    for rule in catalog.rules() {
        let Some(m) = rule.regex.find(prompt) else {
            continue;
        };
        let negated = is_negated(prompt, m.start());
        let confidence = if negated {
            rule.confidence / NEGATION_DIVISOR
        } else {
            rule.confidence
        };
        let entry = candidates.entry(rule.target).or_insert_with(|| Candidate {
            confidence: 0,
            kind: rule.kind,
            matched_keywords: Vec::new(),
            signals: Vec::new(),
        });
        entry.matched_keywords.push(m.as_str().to_string());
        entry.signals.push(if rule.is_phrase {
            "phrase-match".to_string()
        } else {
            "keyword-match".to_string()
        });
        if negated {
            entry.signals.push("negation-discount".to_string());
        }
        // Base score is the max across matching rules, not a sum: three weak
        // keywords must not masquerade as one strong phrase.
        entry.confidence = entry.confidence.max(confidence);
    }

    // Sustained-topic boost: the same target matching in recent history is
    // weak evidence the user is still on that task.
    let recent = history.iter().rev().take(HISTORY_WINDOW);
    let mut boosted: Vec<&str> = Vec::new();
    for entry in recent {
        for rule in catalog.rules() {
            if candidates.contains_key(rule.target)
                && !boosted.contains(&rule.target)
                && rule.regex.is_match(&entry.text)
            {
                boosted.push(rule.target);
            }
        }
    }
    for target in boosted {
        if let Some(candidate) = candidates.get_mut(target) {
            candidate.confidence = (candidate.confidence + HISTORY_BOOST).min(100);
            candidate.signals.push("sustained-topic".to_string());
        }
    }

    // Calibration deltas, clamped into 0-100.
    for adj in adjustments {
        if let Some(candidate) = candidates.get_mut(adj.agent.as_str()) {
            let adjusted = candidate.confidence as i64 + adj.delta as i64;
            candidate.confidence = adjusted.clamp(0, 100) as u32;
            candidate.signals.push(format!("calibration:{:+}", adj.delta));
        }
    }

    let mut agents = Vec::new();
    let mut skills = Vec::new();
    for (target, candidate) in candidates {
        if candidate.confidence < SUGGEST {
            continue;
        }
        let matched = TargetMatch {
            target: target.to_string(),
            confidence: candidate.confidence.min(100),
            matched_keywords: candidate.matched_keywords,
            signals: candidate.signals,
            description: catalog.describe(target).to_string(),
        };
        match candidate.kind {
            TargetKind::Agent => agents.push(matched),
            TargetKind::Skill => skills.push(matched),
        }
    }

    // Descending by confidence; ties broken by catalog declaration order so
    // repeated calls rank identically.
    let order = |m: &TargetMatch| (std::cmp::Reverse(m.confidence), catalog.target_order(&m.target));
    agents.sort_by_key(order);
    skills.sort_by_key(order);

    let should_auto_dispatch = agents
        .first()
        .map(|top| top.confidence >= AUTO_DISPATCH && !dispatched.contains(&top.target))
        .unwrap_or(false);

    ClassificationResult {
        intent: intent.to_string(),
        agents,
        skills,
        should_auto_dispatch,
    }
}

// ---------------------------------------------------------------------------
// Negation detection
// ---------------------------------------------------------------------------

/// True when one of the few tokens preceding `match_start` is a negation
/// marker ("don't touch the database", "no need to deploy").
fn is_negated(prompt: &str, match_start: usize) -> bool {
    let prefix = &prompt[..match_start];
    prefix
        .split_whitespace()
        .rev()
        .take(NEGATION_TOKEN_WINDOW)
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .any(|token| {
            let lower = token.to_lowercase();
            NEGATION_MARKERS.contains(&lower.as_str())
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn run(prompt: &str) -> ClassificationResult {
        classify(Catalog::builtin(), prompt, &[], &[], &[])
    }

    #[test]
    fn empty_input_is_safe() {
        let result = run("");
        assert!(result.agents.is_empty());
        assert!(result.skills.is_empty());
        assert!(!result.should_auto_dispatch);
        assert_eq!(result.intent, "general");
    }

    #[test]
    fn deterministic_for_fixed_inputs() {
        let a = run("design the new api for billing");
        let b = run("design the new api for billing");
        let a_targets: Vec<_> = a.agents.iter().map(|m| (&m.target, m.confidence)).collect();
        let b_targets: Vec<_> = b.agents.iter().map(|m| (&m.target, m.confidence)).collect();
        assert_eq!(a_targets, b_targets);
        assert_eq!(a.intent, b.intent);
    }

    #[test]
    fn phrase_outranks_keyword() {
        let result = run("design the new api for the billing service");
        let top = result.top_agent().unwrap();
        assert_eq!(top.target, "backend-system-architect");
        assert!(top.confidence >= 90);
        assert!(top.signals.iter().any(|s| s == "phrase-match"));
    }

    #[test]
    fn auto_dispatch_requires_threshold() {
        let result = run("please run a security audit on the login flow");
        let top = result.top_agent().unwrap();
        assert_eq!(top.target, "security-auditor");
        assert!(top.confidence >= AUTO_DISPATCH);
        assert!(result.should_auto_dispatch);
    }

    #[test]
    fn cooldown_suppresses_auto_dispatch_flag() {
        let dispatched = vec!["security-auditor".to_string()];
        let result = classify(
            Catalog::builtin(),
            "please run a security audit on the login flow",
            &[],
            &[],
            &dispatched,
        );
        // Ranking is untouched; only the dispatch flag drops.
        assert_eq!(result.top_agent().unwrap().target, "security-auditor");
        assert!(!result.should_auto_dispatch);
    }

    #[test]
    fn negation_scores_strictly_lower() {
        let plain = run("I need database help");
        let negated = run("I don't need database help");
        let plain_score = plain
            .agents
            .iter()
            .find(|m| m.target == "database-specialist")
            .map(|m| m.confidence)
            .unwrap_or(0);
        let negated_score = negated
            .agents
            .iter()
            .find(|m| m.target == "database-specialist")
            .map(|m| m.confidence)
            .unwrap_or(0);
        assert!(plain_score >= SUGGEST);
        assert!(negated_score < plain_score);
    }

    #[test]
    fn negation_marker_outside_window_is_ignored() {
        // "never" is five tokens before the keyword, beyond the window.
        let result = run("never mind all of that previous discussion, the database schema needs work");
        assert!(result
            .agents
            .iter()
            .any(|m| m.target == "database-specialist" && m.confidence >= SUGGEST));
    }

    #[test]
    fn below_suggest_is_dropped() {
        // "query" alone scores 55; a negated match (55/4) must vanish entirely.
        let result = run("do not optimize the query yet");
        assert!(result
            .agents
            .iter()
            .all(|m| m.confidence >= SUGGEST));
    }

    #[test]
    fn history_boost_applies_once() {
        let history = vec![
            PromptHistoryEntry {
                text: "the database schema looks wrong".to_string(),
                timestamp: Utc::now(),
            },
            PromptHistoryEntry {
                text: "add a migration for users".to_string(),
                timestamp: Utc::now(),
            },
        ];
        let without = run("fix the database index");
        let with = classify(Catalog::builtin(), "fix the database index", &history, &[], &[]);
        let score = |r: &ClassificationResult| {
            r.agents
                .iter()
                .find(|m| m.target == "database-specialist")
                .map(|m| m.confidence)
                .unwrap()
        };
        assert_eq!(score(&with), score(&without) + 10);
        let boosted = with
            .agents
            .iter()
            .find(|m| m.target == "database-specialist")
            .unwrap();
        assert_eq!(
            boosted.signals.iter().filter(|s| *s == "sustained-topic").count(),
            1
        );
    }

    #[test]
    fn calibration_delta_clamps() {
        let adjustments = vec![CalibrationAdjustment {
            agent: "security-auditor".to_string(),
            delta: 50,
        }];
        let result = classify(
            Catalog::builtin(),
            "security audit of the token flow",
            &[],
            &adjustments,
            &[],
        );
        let top = result.top_agent().unwrap();
        assert_eq!(top.target, "security-auditor");
        assert_eq!(top.confidence, 100);
    }

    #[test]
    fn negative_calibration_can_drop_a_candidate() {
        let adjustments = vec![CalibrationAdjustment {
            agent: "code-reviewer".to_string(),
            delta: -30,
        }];
        let result = classify(
            Catalog::builtin(),
            "review the config loader",
            &[],
            &adjustments,
            &[],
        );
        assert!(result
            .agents
            .iter()
            .all(|m| m.target != "code-reviewer"));
    }

    #[test]
    fn prefilter_gates_trivial_prompts() {
        assert!(!should_classify(""));
        assert!(!should_classify("   "));
        assert!(!should_classify("/compact"));
        assert!(!should_classify("thanks"));
        assert!(should_classify("fix the login bug"));
    }

    #[test]
    fn skills_ranked_separately_from_agents() {
        let result = run("help me debug this stack trace from the merge conflict");
        assert!(result
            .skills
            .iter()
            .any(|m| m.target == "systematic-debugging"));
        assert!(result.skills.iter().any(|m| m.target == "git-workflow"));
        assert!(result
            .agents
            .iter()
            .all(|m| m.target != "systematic-debugging"));
    }
}
