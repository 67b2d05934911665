use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// OrchestrationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// Prompt history ring buffer capacity per session.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// Prompts are truncated to this many bytes before storage.
    #[serde(default = "default_prompt_truncate")]
    pub prompt_truncate: usize,
    /// Minutes before a dispatched agent may be auto-dispatched again.
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: i64,
}

fn default_history_cap() -> usize {
    10
}

fn default_prompt_truncate() -> usize {
    500
}

fn default_cooldown_minutes() -> i64 {
    240
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            history_cap: default_history_cap(),
            prompt_truncate: default_prompt_truncate(),
            cooldown_minutes: default_cooldown_minutes(),
        }
    }
}

// ---------------------------------------------------------------------------
// AdvisorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Context token budget assumed when the state file doesn't carry one.
    #[serde(default = "default_context_budget")]
    pub context_budget: u64,
    /// Usage ratio at which scoring begins.
    #[serde(default = "default_trigger_ratio")]
    pub trigger_ratio: f64,
    /// Usage ratio at which the critical directive fires.
    #[serde(default = "default_critical_ratio")]
    pub critical_ratio: f64,
    /// Composite score at or below which an item is a pruning candidate.
    #[serde(default = "default_prune_threshold")]
    pub prune_threshold: u32,
    /// Maximum pruning recommendations per invocation.
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
}

fn default_context_budget() -> u64 {
    200_000
}

fn default_trigger_ratio() -> f64 {
    0.70
}

fn default_critical_ratio() -> f64 {
    0.95
}

fn default_prune_threshold() -> u32 {
    15
}

fn default_max_recommendations() -> usize {
    5
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            context_budget: default_context_budget(),
            trigger_ratio: default_trigger_ratio(),
            critical_ratio: default_critical_ratio(),
            prune_threshold: default_prune_threshold(),
            max_recommendations: default_max_recommendations(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub orchestration: OrchestrationConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
}

impl Config {
    /// Load `.stagehand/config.yaml`, falling back to defaults when the file
    /// is absent, then apply environment overrides. Env resolution happens
    /// here so the scoring code stays pure.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        let mut config = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            serde_yaml::from_str(&data)?
        } else {
            Self::default()
        };
        if let Some(budget) = std::env::var("STAGEHAND_CONTEXT_BUDGET")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.advisor.context_budget = budget;
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
