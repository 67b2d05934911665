//! Static agent/skill catalog and keyword table.
//!
//! The host's markdown agent definitions are distilled here into an ordered
//! table of `(pattern, target, confidence)` rules. Order matters: ties in
//! confidence are broken by declaration order, so more specific targets are
//! listed first. The table is compiled into regexes once per process.

use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

pub const AUTO_DISPATCH: u32 = 85;
pub const STRONG_RECOMMEND: u32 = 70;
pub const SUGGEST: u32 = 50;

// ---------------------------------------------------------------------------
// TargetKind / KeywordRule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Agent,
    Skill,
}

pub struct KeywordRule {
    pub pattern: &'static str,
    pub target: &'static str,
    pub kind: TargetKind,
    pub confidence: u32,
}

pub struct TargetInfo {
    pub name: &'static str,
    pub kind: TargetKind,
    pub description: &'static str,
}

// ---------------------------------------------------------------------------
// Rule tables
// ---------------------------------------------------------------------------

/// Single-keyword rules. Patterns are matched case-insensitively on word
/// boundaries.
const KEYWORD_RULES: &[KeywordRule] = &[
    KeywordRule { pattern: r"architect(?:ure)?|microservices?|scalab\w+", target: "backend-system-architect", kind: TargetKind::Agent, confidence: 70 },
    KeywordRule { pattern: r"api|endpoints?|rest|graphql", target: "backend-system-architect", kind: TargetKind::Agent, confidence: 60 },
    KeywordRule { pattern: r"database|schema|migrations?|postgres|sqlite|sql", target: "database-specialist", kind: TargetKind::Agent, confidence: 70 },
    KeywordRule { pattern: r"query|index(?:es|ing)?", target: "database-specialist", kind: TargetKind::Agent, confidence: 55 },
    KeywordRule { pattern: r"frontend|react|component|css|layout", target: "frontend-ui-developer", kind: TargetKind::Agent, confidence: 65 },
    KeywordRule { pattern: r"security|vulnerabilit\w+|exploit|injection", target: "security-auditor", kind: TargetKind::Agent, confidence: 75 },
    KeywordRule { pattern: r"auth(?:entication|orization)?|oauth|jwt", target: "security-auditor", kind: TargetKind::Agent, confidence: 60 },
    KeywordRule { pattern: r"tests?|coverage|flaky|regression", target: "test-engineer", kind: TargetKind::Agent, confidence: 60 },
    KeywordRule { pattern: r"deploy(?:ment)?|docker|kubernetes|pipeline|terraform", target: "devops-engineer", kind: TargetKind::Agent, confidence: 70 },
    KeywordRule { pattern: r"slow|performance|latency|profil\w+|optimi[sz]e", target: "performance-optimizer", kind: TargetKind::Agent, confidence: 65 },
    KeywordRule { pattern: r"review|refactor(?:ing)?", target: "code-reviewer", kind: TargetKind::Agent, confidence: 55 },
    KeywordRule { pattern: r"debug(?:ging)?|stack trace|panics?|segfault", target: "systematic-debugging", kind: TargetKind::Skill, confidence: 65 },
    KeywordRule { pattern: r"rebase|cherry-pick|merge conflicts?|bisect", target: "git-workflow", kind: TargetKind::Skill, confidence: 65 },
    KeywordRule { pattern: r"readme|docs?|documentation|changelog", target: "doc-writing", kind: TargetKind::Skill, confidence: 55 },
];

/// Multi-word phrase rules. Stronger intent evidence than single keywords,
/// so these carry auto-dispatch-grade confidence.
const PHRASE_RULES: &[KeywordRule] = &[
    KeywordRule { pattern: r"design (?:the |an? )?(?:new )?(?:api|service|system)", target: "backend-system-architect", kind: TargetKind::Agent, confidence: 90 },
    KeywordRule { pattern: r"(?:database|schema) (?:design|migration)", target: "database-specialist", kind: TargetKind::Agent, confidence: 88 },
    KeywordRule { pattern: r"optimi[sz]e (?:this |the )?(?:slow )?quer(?:y|ies)", target: "database-specialist", kind: TargetKind::Agent, confidence: 90 },
    KeywordRule { pattern: r"security (?:audit|review)", target: "security-auditor", kind: TargetKind::Agent, confidence: 92 },
    KeywordRule { pattern: r"(?:write|add) (?:unit |integration )?tests", target: "test-engineer", kind: TargetKind::Agent, confidence: 85 },
    KeywordRule { pattern: r"set up (?:ci|cd|ci/cd|the pipeline)", target: "devops-engineer", kind: TargetKind::Agent, confidence: 88 },
    KeywordRule { pattern: r"review (?:this |the |my )?(?:pr|pull request|diff|code)", target: "code-reviewer", kind: TargetKind::Agent, confidence: 86 },
    KeywordRule { pattern: r"track down (?:this |the )?(?:bug|crash|leak)", target: "systematic-debugging", kind: TargetKind::Skill, confidence: 85 },
];

const TARGETS: &[TargetInfo] = &[
    TargetInfo { name: "backend-system-architect", kind: TargetKind::Agent, description: "API, service, and system architecture design" },
    TargetInfo { name: "database-specialist", kind: TargetKind::Agent, description: "Schema design, migrations, and query tuning" },
    TargetInfo { name: "frontend-ui-developer", kind: TargetKind::Agent, description: "UI components, styling, and client-side state" },
    TargetInfo { name: "security-auditor", kind: TargetKind::Agent, description: "Vulnerability review and auth hardening" },
    TargetInfo { name: "test-engineer", kind: TargetKind::Agent, description: "Test authoring, coverage, and flake hunting" },
    TargetInfo { name: "devops-engineer", kind: TargetKind::Agent, description: "Deployment, containers, and CI/CD pipelines" },
    TargetInfo { name: "performance-optimizer", kind: TargetKind::Agent, description: "Profiling and latency reduction" },
    TargetInfo { name: "code-reviewer", kind: TargetKind::Agent, description: "Code review and refactoring guidance" },
    TargetInfo { name: "systematic-debugging", kind: TargetKind::Skill, description: "Hypothesis-driven debugging workflow" },
    TargetInfo { name: "git-workflow", kind: TargetKind::Skill, description: "History surgery: rebase, bisect, conflict resolution" },
    TargetInfo { name: "doc-writing", kind: TargetKind::Skill, description: "README, API docs, and changelog authoring" },
];

// ---------------------------------------------------------------------------
// Intent markers
// ---------------------------------------------------------------------------

/// Coarse intent labels for telemetry. First label whose marker matches wins.
const INTENT_MARKERS: &[(&str, &str)] = &[
    ("debugging", r"\b(?:fix|bug|broken|crash|error|fail(?:s|ing|ed)?|debug)\b"),
    ("review", r"\b(?:review|refactor|clean ?up|audit)\b"),
    ("implementation", r"\b(?:implement|add|create|build|write|set up)\b"),
    ("planning", r"\b(?:plan|design|architect|roadmap|propose)\b"),
    ("question", r"\b(?:how|what|why|where|which|should|can)\b|\?"),
];

pub const DEFAULT_INTENT: &str = "general";

// ---------------------------------------------------------------------------
// Compiled catalog
// ---------------------------------------------------------------------------

pub struct CompiledRule {
    pub regex: Regex,
    pub target: &'static str,
    pub kind: TargetKind,
    pub confidence: u32,
    /// True for phrase rules; phrases skip the single-token negation window
    /// only in the sense that their own leading token anchors the window.
    pub is_phrase: bool,
}

pub struct Catalog {
    rules: Vec<CompiledRule>,
    intents: Vec<(&'static str, Regex)>,
}

impl Catalog {
    /// The built-in catalog, compiled once per process.
    pub fn builtin() -> &'static Catalog {
        static CATALOG: OnceLock<Catalog> = OnceLock::new();
        CATALOG.get_or_init(Catalog::compile)
    }

    fn compile() -> Catalog {
        let mut rules = Vec::with_capacity(PHRASE_RULES.len() + KEYWORD_RULES.len());
        // Phrases first: at equal confidence the stronger evidence wins ties.
        for rule in PHRASE_RULES {
            rules.push(CompiledRule {
                regex: compile_word_bounded(rule.pattern),
                target: rule.target,
                kind: rule.kind,
                confidence: rule.confidence,
                is_phrase: true,
            });
        }
        for rule in KEYWORD_RULES {
            rules.push(CompiledRule {
                regex: compile_word_bounded(rule.pattern),
                target: rule.target,
                kind: rule.kind,
                confidence: rule.confidence,
                is_phrase: false,
            });
        }
        let intents = INTENT_MARKERS
            .iter()
            .map(|(label, pattern)| {
                (
                    *label,
                    RegexBuilder::new(pattern)
                        .case_insensitive(true)
                        .build()
                        .expect("intent marker patterns are static"),
                )
            })
            .collect();
        Catalog { rules, intents }
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Declaration-order index of a target, used for stable tie-breaking.
    pub fn target_order(&self, name: &str) -> usize {
        TARGETS
            .iter()
            .position(|t| t.name == name)
            .unwrap_or(usize::MAX)
    }

    pub fn describe(&self, name: &str) -> &'static str {
        TARGETS
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.description)
            .unwrap_or("")
    }

    /// Coarse intent label for a prompt. Telemetry only, never routing.
    pub fn intent_of(&self, prompt: &str) -> &'static str {
        for (label, regex) in &self.intents {
            if regex.is_match(prompt) {
                return label;
            }
        }
        DEFAULT_INTENT
    }
}

fn compile_word_bounded(pattern: &str) -> Regex {
    RegexBuilder::new(&format!(r"\b(?:{pattern})\b"))
        .case_insensitive(true)
        .build()
        .expect("catalog patterns are static and known-valid")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
