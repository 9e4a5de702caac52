//! Event types for Chatter speech output.
//!
//! This module defines the shared schema handed to event sinks. A
//! [`SpeakEvent`] serializes to the wire form consumed by avatar clients:
//!
//! ```json
//! {"type":"speak","text":"...","emotion":"happy"}
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Emotion labels understood by the avatar.
///
/// The declaration order is significant: it is the tie-break order used by
/// the classifier when two labels end with the same score.
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
    /// All labels in tie-break order, `Neutral` first.
    pub const ALL: [Emotion; 6] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Angry,
        Emotion::Sad,
        Emotion::Relaxed,
        Emotion::Surprised,
    ];

    /// The five labels that carry affect (everything except `Neutral`).
    pub const AFFECTIVE: [Emotion; 5] = [
        Emotion::Happy,
        Emotion::Angry,
        Emotion::Sad,
        Emotion::Relaxed,
        Emotion::Surprised,
    ];

    /// Returns the lowercase wire label.
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

    /// Position of this label in [`Emotion::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown emotion label.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown emotion: {0}")]
pub struct UnknownEmotion(pub String);

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| UnknownEmotion(s.to_string()))
    }
}

/// Text fragment pulled out of one log line, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Trimmed, non-blank text.
    pub text: String,
}

/// A single utterance for the avatar to speak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "speak")]
pub struct SpeakEvent {
    /// Cleaned, non-empty text.
    pub text: String,

    /// Emotion the avatar should display while speaking.
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

    /// Serializes the event to its wire form.
    ///
    /// Serialization of this struct cannot fail: every field is a string or
    /// a unit enum variant.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
