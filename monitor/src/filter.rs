//! Text cleaning for speech synthesis.
//!
//! Assistant replies are Markdown with code, links and commit hashes mixed
//! in. None of that reads well aloud, so [`clean_text_for_speech`] strips
//! or transliterates it before the text reaches the synthesis engine.
//!
//! The stages run in a fixed order and each one sees the output of the
//! previous stage:
//!
//! 1. fenced code blocks
//! 2. HTML/XML tags
//! 3. heading markers
//! 4. horizontal rules
//! 5. table rows
//! 6. blockquote markers
//! 7. unordered list markers (numbered lists are kept)
//! 8. URLs
//! 9. bare hex tokens of 7 to 40 characters
//! 10. inline code backticks (content kept)
//! 11. colons
//! 12. round parentheses, read out as `、かっこ、` / `、かっこ閉じ、`

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Spoken rendering of an opening parenthesis.
pub const OPEN_PAREN_READING: &str = "、かっこ、";

/// Spoken rendering of a closing parenthesis.
pub const CLOSE_PAREN_READING: &str = "、かっこ閉じ、";

/// Shortest hex run treated as a commit-hash-like identifier.
const MIN_HEX_TOKEN_LEN: usize = 7;

/// Longest hex run treated as a commit-hash-like identifier.
const MAX_HEX_TOKEN_LEN: usize = 40;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern:?}: {e}"))
}

static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| compile(r"(?s)```.*?```"));
static HTML_TAG: Lazy<Regex> = Lazy::new(|| compile(r"<[^>]+>"));
static HEADING: Lazy<Regex> = Lazy::new(|| compile(r"(?mR)^#{1,6}\s+"));
static HORIZONTAL_RULE: Lazy<Regex> = Lazy::new(|| compile(r"(?mR)^[-*]{3,}$"));
static TABLE_ROW: Lazy<Regex> = Lazy::new(|| compile(r"(?mR)^\|.*\|$"));
static BLOCKQUOTE: Lazy<Regex> = Lazy::new(|| compile(r"(?mR)^>\s*"));
static LIST_MARKER: Lazy<Regex> = Lazy::new(|| compile(r"(?mR)^[-*]\s+"));
static URL: Lazy<Regex> = Lazy::new(|| compile(r"https?://\S+"));
// ASCII word runs; hex-only runs of the right length are dropped whole.
static ASCII_WORD: Lazy<Regex> = Lazy::new(|| compile(r"[0-9A-Za-z_]+"));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| compile(r"`([^`]+)`"));

/// Cleans text for speech synthesis.
///
/// Total over every input: empty input yields empty output and text that
/// contains nothing to strip (including whitespace-only text) is returned
/// unchanged. Newlines and other punctuation are preserved.
///
/// # Example
///
/// ```
/// use chatter_monitor::filter::clean_text_for_speech;
///
/// assert_eq!(
///     clean_text_for_speech("関数(引数)を呼び出す"),
///     "関数、かっこ、引数、かっこ閉じ、を呼び出す"
/// );
/// ```
#[must_use]
pub fn clean_text_for_speech(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut cleaned = text.to_string();

    for re in [
        &*CODE_BLOCK,
        &*HTML_TAG,
        &*HEADING,
        &*HORIZONTAL_RULE,
        &*TABLE_ROW,
        &*BLOCKQUOTE,
        &*LIST_MARKER,
        &*URL,
    ] {
        cleaned = replace(&cleaned, re, "");
    }

    cleaned = ASCII_WORD
        .replace_all(&cleaned, |caps: &Captures<'_>| {
            let word = &caps[0];
            if is_hex_token(word) {
                String::new()
            } else {
                word.to_string()
            }
        })
        .into_owned();

    cleaned = replace(&cleaned, &INLINE_CODE, "$1");

    let mut spoken = String::with_capacity(cleaned.len());
    for ch in cleaned.chars() {
        match ch {
            ':' => {}
            '(' | '（' => spoken.push_str(OPEN_PAREN_READING),
            ')' | '）' => spoken.push_str(CLOSE_PAREN_READING),
            other => spoken.push(other),
        }
    }

    spoken
}

fn replace(text: &str, re: &Regex, replacement: &str) -> String {
    match re.replace_all(text, replacement) {
        Cow::Borrowed(_) => text.to_string(),
        Cow::Owned(s) => s,
    }
}

fn is_hex_token(word: &str) -> bool {
    (MIN_HEX_TOKEN_LEN..=MAX_HEX_TOKEN_LEN).contains(&word.len())
        && word.bytes().all(|b| b.is_ascii_hexdigit())
}
