//! Host hook contract: the input each hook receives on stdin and the closed
//! set of result shapes it may print. Field names are part of the host's
//! wire schema, so serde renames are load-bearing here.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// HookInput
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HookInput {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub project_dir: Option<PathBuf>,
}

impl HookInput {
    /// Parse host JSON, substituting defaults for anything malformed. The
    /// hook must produce a valid result even for garbage input.
    pub fn from_json(data: &str) -> Self {
        serde_json::from_str(data).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// HookResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: String,
    pub additional_context: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HookResult {
    #[serde(rename = "continue")]
    pub continue_: bool,
    #[serde(rename = "hookSpecificOutput", skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

impl HookResult {
    /// The do-nothing result. Also the fallback for every internal error:
    /// hooks inform or stay quiet, they never block and never crash.
    pub fn silent() -> Self {
        Self {
            continue_: true,
            hook_specific_output: None,
        }
    }

    /// A result that injects markdown into the host's context.
    pub fn with_context(event: &str, additional_context: String) -> Self {
        Self {
            continue_: true,
            hook_specific_output: Some(HookSpecificOutput {
                hook_event_name: event.to_string(),
                additional_context,
            }),
        }
    }
}

pub const EVENT_USER_PROMPT: &str = "UserPromptSubmit";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_wire_shape() {
        let json = serde_json::to_string(&HookResult::silent()).unwrap();
        assert_eq!(json, "{\"continue\":true}");
    }

    #[test]
    fn context_wire_shape() {
        let result = HookResult::with_context(EVENT_USER_PROMPT, "hello".to_string());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["continue"], true);
        assert_eq!(json["hookSpecificOutput"]["hookEventName"], "UserPromptSubmit");
        assert_eq!(json["hookSpecificOutput"]["additionalContext"], "hello");
    }

    #[test]
    fn malformed_input_defaults() {
        let input = HookInput::from_json("{\"prompt\": 42}");
        assert!(input.prompt.is_empty());
        assert!(input.session_id.is_empty());

        let input = HookInput::from_json("not json");
        assert!(input.prompt.is_empty());
    }

    #[test]
    fn input_parses_host_fields() {
        let input = HookInput::from_json(
            "{\"prompt\": \"fix it\", \"session_id\": \"abc\", \"project_dir\": \"/tmp/p\"}",
        );
        assert_eq!(input.prompt, "fix it");
        assert_eq!(input.session_id, "abc");
        assert_eq!(input.project_dir.unwrap(), PathBuf::from("/tmp/p"));
    }
}
