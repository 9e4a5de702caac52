//! Claude Code JSONL line parser.
//!
//! Claude Code writes session data as JSONL (JSON Lines) files at
//! `~/.claude/projects/<slugified-path>/<uuid>.jsonl`. Each line is one JSON
//! object; the lines this module cares about look like:
//!
//! ```json
//! {"message":{"role":"assistant","type":"message","content":[
//!     {"type":"thinking","thinking":"..."},
//!     {"type":"text","text":"ファイルを確認します。"},
//!     {"type":"tool_use","name":"Read","input":{}}
//! ]}}
//! ```
//!
//! # Extraction rules
//!
//! | Role | Content item | Extracted |
//! |------|--------------|-----------|
//! | `assistant` | `text` with non-blank text | trimmed text |
//! | `assistant` | `thinking`, `tool_use`, anything else | nothing |
//! | `user` | `text` wrapped in `<local-command-stdout>` | trimmed interior, main-agent mode only |
//! | anything else | | nothing |
//!
//! Lines that fail to parse are dropped without logging: partially flushed
//! lines are routine while Claude Code is writing.

use serde::Deserialize;
use serde_json::Value;

use crate::types::Extraction;

/// Opening tag around shell output reported as a user message.
pub const LOCAL_STDOUT_OPEN: &str = "<local-command-stdout>";

/// Closing tag around shell output reported as a user message.
pub const LOCAL_STDOUT_CLOSE: &str = "</local-command-stdout>";

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    role: Option<String>,

    #[serde(rename = "type", default)]
    kind: Option<String>,

    /// Kept untyped: items carry arbitrary extra fields and non-array
    /// content must be ignored rather than rejected.
    #[serde(default)]
    content: Value,
}

impl RawMessage {
    fn is(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role) && self.kind.as_deref() == Some("message")
    }

    /// Text of every `type: "text"` content item, in order.
    fn text_items(&self) -> impl Iterator<Item = &str> {
        self.content
            .as_array()
            .into_iter()
            .flatten()
            .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|item| item.get("text").and_then(Value::as_str))
    }
}

/// Extracts the speakable text fragments from one log line.
///
/// Returns an empty list for malformed JSON and for any shape other than
/// the two described in the module docs. Fragments keep the order of the
/// `content` array. When `include_sub_agents` is set, user-role shell
/// output is not extracted.
///
/// # Example
///
/// ```
/// use chatter_monitor::parser::parse_line;
///
/// let line = r#"{"message":{"role":"assistant","type":"message","content":[{"type":"text","text":" こんにちは "}]}}"#;
/// let extracted = parse_line(line, false);
/// assert_eq!(extracted.len(), 1);
/// assert_eq!(extracted[0].text, "こんにちは");
///
/// assert!(parse_line("{not json", false).is_empty());
/// ```
#[must_use]
pub fn parse_line(line: &str, include_sub_agents: bool) -> Vec<Extraction> {
    let Ok(entry) = serde_json::from_str::<RawEntry>(line) else {
        return Vec::new();
    };
    let Some(message) = entry.message else {
        return Vec::new();
    };

    if message.is("assistant") {
        return message
            .text_items()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| Extraction {
                text: text.to_string(),
            })
            .collect();
    }

    if !include_sub_agents && message.is("user") {
        return message
            .text_items()
            .filter_map(unwrap_local_stdout)
            .map(|text| Extraction {
                text: text.to_string(),
            })
            .collect();
    }

    Vec::new()
}

/// Returns the trimmed interior of a `<local-command-stdout>` wrapper.
fn unwrap_local_stdout(text: &str) -> Option<&str> {
    let inner = text
        .trim()
        .strip_prefix(LOCAL_STDOUT_OPEN)?
        .strip_suffix(LOCAL_STDOUT_CLOSE)?
        .trim();
    (!inner.is_empty()).then_some(inner)
}
