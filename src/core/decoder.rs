//! Streaming response decoder
//!
//! Interprets the line protocol of a streaming completion: each line may
//! carry a `data: ` prefixed JSON frame, the `[DONE]` sentinel, or noise.
//! Frames hold incremental deltas on two channels, ordinary answer text and
//! reasoning text, which accumulate separately. Lines that fail to parse are
//! dropped without ending the stream; providers interleave keep-alives and
//! comment lines that must not kill a response.
//!
//! The decoder is transport-free. Whatever produces lines (an HTTP chunk
//! stream, a test fixture) feeds them in and applies the returned events.

use crate::api::ChatResponse;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// One observable step of a decoded stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// New answer text, in arrival order.
    AnswerDelta(String),
    /// New reasoning text, in arrival order.
    ReasoningDelta(String),
    /// The provider signalled end of stream.
    End,
}

/// Accumulating decoder for one streaming response.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    answer: String,
    reasoning: String,
    terminated: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one stream line into zero or more events.
    ///
    /// Empty lines and undecodable frames produce nothing. A frame carrying
    /// both channels yields the answer delta before the reasoning delta.
    pub fn feed(&mut self, raw_line: &str) -> Vec<StreamEvent> {
        debug_assert!(!self.terminated, "fed a line after end of stream");

        let line = raw_line.trim();
        if line.is_empty() {
            return Vec::new();
        }

        let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line);
        if payload == DONE_SENTINEL {
            self.terminated = true;
            return vec![StreamEvent::End];
        }

        let frame: ChatResponse = match serde_json::from_str(payload) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!("dropping undecodable stream line: {err}");
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        // Some providers send a final frame with an empty choices array;
        // it carries no delta and is not an error.
        if let Some(choice) = frame.choices.first() {
            if let Some(content) = choice.delta.content.as_deref() {
                if !content.is_empty() {
                    self.answer.push_str(content);
                    events.push(StreamEvent::AnswerDelta(content.to_string()));
                }
            }
            if let Some(reasoning) = choice.delta.reasoning_content.as_deref() {
                if !reasoning.is_empty() {
                    self.reasoning.push_str(reasoning);
                    events.push(StreamEvent::ReasoningDelta(reasoning.to_string()));
                }
            }
        }
        events
    }

    /// Whether the `[DONE]` sentinel has been seen.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// Whether any delta has arrived on either channel.
    pub fn has_output(&self) -> bool {
        !self.answer.is_empty() || !self.reasoning.trim().is_empty()
    }

    /// Consumes the decoder, returning the accumulated answer and the
    /// trimmed reasoning (`None` when no reasoning text arrived). Valid
    /// whether or not the stream terminated cleanly, so a connection that
    /// dies mid-response still yields the partial text.
    pub fn finish(self) -> (String, Option<String>) {
        let reasoning = self.reasoning.trim();
        let reasoning = if reasoning.is_empty() {
            None
        } else {
            Some(reasoning.to_string())
        };
        (self.answer, reasoning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_answer_reasoning_and_end() {
        let mut decoder = StreamDecoder::new();
        let events: Vec<StreamEvent> = [
            r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#,
            r#"data: {"choices":[{"delta":{"reasoning_content":" think"}}]}"#,
            "data: [DONE]",
        ]
        .iter()
        .flat_map(|line| decoder.feed(line))
        .collect();

        assert_eq!(
            events,
            vec![
                StreamEvent::AnswerDelta("Hi".to_string()),
                StreamEvent::ReasoningDelta(" think".to_string()),
                StreamEvent::End,
            ]
        );
        assert!(decoder.is_terminated());
        let (answer, reasoning) = decoder.finish();
        assert_eq!(answer, "Hi");
        assert_eq!(reasoning.as_deref(), Some("think"));
    }

    #[test]
    fn malformed_lines_are_dropped_silently() {
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.feed(r#"data: {"choices":"#), Vec::new());
        assert_eq!(decoder.feed(": keep-alive"), Vec::new());
        assert_eq!(
            decoder.feed(r#"data: {"choices":[{"delta":{"content":"ok"}}]}"#),
            vec![StreamEvent::AnswerDelta("ok".to_string())]
        );
        assert_eq!(decoder.answer(), "ok");
    }

    #[test]
    fn both_channels_in_one_frame_emit_answer_first() {
        let mut decoder = StreamDecoder::new();
        let events = decoder
            .feed(r#"data: {"choices":[{"delta":{"content":"a","reasoning_content":"r"}}]}"#);
        assert_eq!(
            events,
            vec![
                StreamEvent::AnswerDelta("a".to_string()),
                StreamEvent::ReasoningDelta("r".to_string()),
            ]
        );
    }

    #[test]
    fn blank_and_whitespace_lines_emit_nothing() {
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.feed(""), Vec::new());
        assert_eq!(decoder.feed("   \r"), Vec::new());
    }

    #[test]
    fn unprefixed_json_frames_still_decode() {
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(r#"{"choices":[{"delta":{"content":"raw"}}]}"#);
        assert_eq!(events, vec![StreamEvent::AnswerDelta("raw".to_string())]);
    }

    #[test]
    fn prefix_inside_content_is_preserved() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(r#"data: {"choices":[{"delta":{"content":"data: x"}}]}"#);
        assert_eq!(decoder.answer(), "data: x");
    }

    #[test]
    fn empty_choices_and_empty_deltas_emit_nothing() {
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.feed(r#"data: {"choices":[]}"#), Vec::new());
        assert_eq!(
            decoder.feed(r#"data: {"choices":[{"delta":{"content":""}}]}"#),
            Vec::new()
        );
        assert_eq!(decoder.feed(r#"data: {"choices":[{"delta":{}}]}"#), Vec::new());
        assert!(!decoder.has_output());
    }

    #[test]
    fn only_first_choice_is_read() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(
            r#"data: {"choices":[{"delta":{"content":"first"}},{"delta":{"content":"second"}}]}"#,
        );
        assert_eq!(decoder.answer(), "first");
    }

    #[test]
    fn interleaved_channels_accumulate_independently() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(r#"data: {"choices":[{"delta":{"reasoning_content":"step one, "}}]}"#);
        decoder.feed(r#"data: {"choices":[{"delta":{"content":"The "}}]}"#);
        decoder.feed(r#"data: {"choices":[{"delta":{"reasoning_content":"step two "}}]}"#);
        decoder.feed(r#"data: {"choices":[{"delta":{"content":"answer"}}]}"#);
        assert_eq!(decoder.answer(), "The answer");
        assert_eq!(decoder.reasoning(), "step one, step two ");
        let (answer, reasoning) = decoder.finish();
        assert_eq!(answer, "The answer");
        assert_eq!(reasoning.as_deref(), Some("step one, step two"));
    }

    #[test]
    fn finish_without_done_returns_partial_text() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(r#"data: {"choices":[{"delta":{"content":"cut off"}}]}"#);
        assert!(!decoder.is_terminated());
        let (answer, reasoning) = decoder.finish();
        assert_eq!(answer, "cut off");
        assert!(reasoning.is_none());
    }

    #[test]
    fn whitespace_only_reasoning_finishes_as_none() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(r#"data: {"choices":[{"delta":{"reasoning_content":"  \n"}}]}"#);
        assert!(!decoder.has_output());
        let (_, reasoning) = decoder.finish();
        assert!(reasoning.is_none());
    }
}
