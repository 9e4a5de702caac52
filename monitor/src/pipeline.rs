//! Line-to-event pipeline: parse, classify, clean.

use tracing::info;

use crate::classifier::EmotionClassifier;
use crate::filter::clean_text_for_speech;
use crate::parser::parse_line;
use crate::sink::EventSink;
use crate::types::SpeakEvent;

/// Number of characters of each emitted text written to the log.
const LOG_PREVIEW_CHARS: usize = 50;

/// Turns raw log lines into speak events.
///
/// Classification runs on the extracted text before cleaning, so code
/// blocks and inline code still count as technical signals.
#[derive(Debug)]
pub struct SpeechPipeline {
    classifier: EmotionClassifier,
    include_sub_agents: bool,
}

impl SpeechPipeline {
    #[must_use]
    pub fn new(include_sub_agents: bool) -> Self {
        Self {
            classifier: EmotionClassifier::new(),
            include_sub_agents,
        }
    }

    #[must_use]
    pub fn include_sub_agents(&self) -> bool {
        self.include_sub_agents
    }

    /// Returns the events for one line, in content order.
    ///
    /// Fragments that are blank after cleaning (a reply that was only a
    /// code block, say) produce no event. Other text is emitted exactly as
    /// the cleaner returns it.
    #[must_use]
    pub fn process_line(&self, line: &str) -> Vec<SpeakEvent> {
        parse_line(line, self.include_sub_agents)
            .into_iter()
            .filter_map(|extraction| {
                let emotion = self.classifier.classify(&extraction.text);
                let cleaned = clean_text_for_speech(&extraction.text);
                (!cleaned.trim().is_empty()).then(|| SpeakEvent::new(cleaned, emotion))
            })
            .collect()
    }

    /// Processes one line and hands every event to `sink`.
    ///
    /// Returns the number of events emitted.
    pub fn emit_line(&self, line: &str, sink: &dyn EventSink) -> usize {
        let events = self.process_line(line);
        for event in &events {
            let preview: String = event.text.chars().take(LOG_PREVIEW_CHARS).collect();
            info!(emotion = %event.emotion, text = %preview, "Extracted text");
            sink.broadcast(&event.to_json());
        }
        events.len()
    }
}
