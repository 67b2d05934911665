use crate::error::{Result, StagehandError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const STAGEHAND_DIR: &str = ".stagehand";
pub const SESSIONS_DIR: &str = ".stagehand/sessions";

pub const CONFIG_FILE: &str = ".stagehand/config.yaml";
pub const CALIBRATION_FILE: &str = ".stagehand/calibration.json";
pub const DECISIONS_FILE: &str = ".stagehand/decisions.jsonl";
pub const GRAPH_QUEUE_FILE: &str = ".stagehand/graph-queue.jsonl";
pub const LOG_FILE: &str = ".stagehand/hooks.log";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn stagehand_dir(root: &Path) -> PathBuf {
    root.join(STAGEHAND_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn calibration_path(root: &Path) -> PathBuf {
    root.join(CALIBRATION_FILE)
}

pub fn session_state_path(root: &Path, session_id: &str) -> PathBuf {
    root.join(SESSIONS_DIR)
        .join(format!("{session_id}.orchestration.json"))
}

pub fn context_state_path(root: &Path, session_id: &str) -> PathBuf {
    root.join(SESSIONS_DIR)
        .join(format!("{session_id}.context.json"))
}

pub fn decisions_path(root: &Path) -> PathBuf {
    root.join(DECISIONS_FILE)
}

pub fn graph_queue_path(root: &Path) -> PathBuf {
    root.join(GRAPH_QUEUE_FILE)
}

pub fn log_path(root: &Path) -> PathBuf {
    root.join(LOG_FILE)
}

// ---------------------------------------------------------------------------
// Session id validation
// ---------------------------------------------------------------------------

static SESSION_ID_RE: OnceLock<Regex> = OnceLock::new();

fn session_id_re() -> &'static Regex {
    SESSION_ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_\-]*$").unwrap())
}

/// Session ids become file names, so anything that could traverse
/// directories or smuggle separators is rejected.
pub fn validate_session_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 128 || !session_id_re().is_match(id) {
        return Err(StagehandError::InvalidSessionId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_session_ids() {
        for id in ["abc123", "f47ac10b-58cc-4372-a567", "s_1", "X"] {
            validate_session_id(id).unwrap_or_else(|_| panic!("expected valid: {id}"));
        }
    }

    #[test]
    fn invalid_session_ids() {
        for id in ["", "../escape", "a/b", "has space", ".hidden", "-lead"] {
            assert!(validate_session_id(id).is_err(), "expected invalid: {id}");
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.stagehand/config.yaml")
        );
        assert_eq!(
            session_state_path(root, "s1"),
            PathBuf::from("/tmp/proj/.stagehand/sessions/s1.orchestration.json")
        );
        assert_eq!(
            context_state_path(root, "s1"),
            PathBuf::from("/tmp/proj/.stagehand/sessions/s1.context.json")
        );
    }
}
