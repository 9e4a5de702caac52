//! Speak event types for the Chatter server.
//!
//! The hub relays the same wire form the monitor produces:
//!
//! ```json
//! {"type":"speak","text":"...","emotion":"happy"}
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Emotion labels understood by avatar clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Angry,
    Sad,
    Relaxed,
    Surprised,
}

impl Emotion {
    pub const ALL: [Emotion; 6] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Angry,
        Emotion::Sad,
        Emotion::Relaxed,
        Emotion::Surprised,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Angry => "angry",
            Self::Sad => "sad",
            Self::Relaxed => "relaxed",
            Self::Surprised => "surprised",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown emotion: {s}"))
    }
}

/// A single utterance broadcast to every connected client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "speak")]
pub struct SpeakEvent {
    pub text: String,
    pub emotion: Emotion,
}

impl SpeakEvent {
    #[must_use]
    pub fn new(text: impl Into<String>, emotion: Emotion) -> Self {
        Self {
            text: text.into(),
            emotion,
        }
    }
}

/// Body of `POST /speak`, and of text frames sent by WebSocket clients.
///
/// Fields are kept loosely typed so that a wrong-typed `text` reads as a
/// missing one and an unknown `emotion` falls back to neutral.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeakRequest {
    #[serde(default)]
    pub text: Option<Value>,

    #[serde(default)]
    pub emotion: Option<Value>,
}

impl SpeakRequest {
    /// Builds the event to broadcast, or `None` when `text` is missing,
    /// not a string, or blank.
    #[must_use]
    pub fn into_event(self) -> Option<SpeakEvent> {
        let text = match self.text {
            Some(Value::String(text)) if !text.trim().is_empty() => text,
            _ => return None,
        };

        let emotion = self
            .emotion
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|label| label.parse().ok())
            .unwrap_or_default();

        Some(SpeakEvent { text, emotion })
    }
}
