//! Request-body adapter
//!
//! Pure translation from the conversation model to the provider wire format.
//! The shape of each message depends on whether the request targets a
//! vision-capable model: vision targets get typed part lists, text targets
//! get each turn flattened to a single string with reference material
//! rendered inline. No network access happens here.

use crate::api::{ChatMessage, ChatRequest, ContentPart, ImagePayload, MessageContent};
use crate::core::builtin_models::is_hybrid_reasoning_model;
use crate::core::config::ModelParameters;
use crate::core::message::{ContentBlock, ReferenceItem, Turn, TurnContent};

const REFERENCE_PREAMBLE: &str = "\n\n【related references】\n";
const ORIGINAL_INPUT_HEADER: &str = "original input:\n";
const REFERENCE_CONTENT_LIMIT: usize = 4096;
const UNTITLED_REFERENCE: &str = "untitled";
const UNLINKED_REFERENCE: &str = "no link";

/// Vision routing is a per-request decision made from the latest turn only.
/// Earlier image turns do not force a vision model; their images are dropped
/// in the flattened rendering instead.
pub fn wants_vision(turns: &[Turn]) -> bool {
    turns.last().is_some_and(Turn::has_image)
}

/// The session-level reasoning preference: ask for reasoning whenever the
/// user-selected model is hybrid, even if a vision override routes the
/// actual request elsewhere.
pub fn thinking_preference(selected_model: &str) -> Option<bool> {
    is_hybrid_reasoning_model(selected_model).then_some(true)
}

/// Builds the complete request body for one completion call.
///
/// `enable_thinking` is serialized only when set and `target_model` is on
/// the hybrid-reasoning allow-list; other models reject the field.
pub fn build_request(
    turns: &[Turn],
    params: &ModelParameters,
    target_model: &str,
    use_vision: bool,
    enable_thinking: Option<bool>,
    stream: bool,
) -> ChatRequest {
    ChatRequest {
        model: target_model.to_string(),
        messages: convert_turns(turns, use_vision),
        max_tokens: params.max_tokens,
        temperature: params.temperature,
        top_p: params.top_p,
        stream,
        enable_thinking: enable_thinking.filter(|_| is_hybrid_reasoning_model(target_model)),
    }
}

fn convert_turns(turns: &[Turn], use_vision: bool) -> Vec<ChatMessage> {
    turns
        .iter()
        .map(|turn| ChatMessage {
            role: turn.role().as_str().to_string(),
            content: if use_vision {
                vision_content(&turn.content)
            } else {
                MessageContent::Text(flatten_content(&turn.content))
            },
        })
        .collect()
}

/// Vision targets accept only text and image parts; reference and unknown
/// blocks are dropped. Bare strings become a single text part.
fn vision_content(content: &TurnContent) -> MessageContent {
    let parts = match content {
        TurnContent::Text(text) => vec![ContentPart::Text { text: text.clone() }],
        TurnContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(ContentPart::Text { text: text.clone() }),
                ContentBlock::ImageUrl { image_url } => Some(ContentPart::ImageUrl {
                    image_url: ImagePayload {
                        url: image_url.url.clone(),
                    },
                }),
                ContentBlock::Reference { .. } | ContentBlock::Unknown(_) => None,
            })
            .collect(),
    };
    MessageContent::Parts(parts)
}

/// Text targets get one string per turn: rendered references first (when
/// any), then the space-joined text blocks. Images and unknown blocks are
/// omitted.
fn flatten_content(content: &TurnContent) -> String {
    let blocks = match content {
        TurnContent::Text(text) => return text.clone(),
        TurnContent::Blocks(blocks) => blocks,
    };

    let mut flattened = String::new();
    let mut item_number = 0;
    for block in blocks {
        if let ContentBlock::Reference { reference } = block {
            for item in reference {
                if item_number == 0 {
                    flattened.push_str(REFERENCE_PREAMBLE);
                }
                item_number += 1;
                render_reference_item(&mut flattened, item_number, item);
            }
        }
    }
    if item_number > 0 {
        flattened.push_str(ORIGINAL_INPUT_HEADER);
    }

    let texts: Vec<&str> = blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    flattened.push_str(&texts.join(" "));
    flattened
}

fn render_reference_item(out: &mut String, number: usize, item: &ReferenceItem) {
    let excerpt: String = item.content.chars().take(REFERENCE_CONTENT_LIMIT).collect();
    let title = item.title.as_deref().unwrap_or(UNTITLED_REFERENCE);
    let link = item.link.as_deref().unwrap_or(UNLINKED_REFERENCE);
    out.push_str(&format!("{number}. {excerpt}\n\nSource: {title} ({link})\n\n"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::{ImageSource, Role};
    use serde_json::json;

    fn text_block(text: &str) -> ContentBlock {
        ContentBlock::Text {
            text: text.to_string(),
        }
    }

    fn image_block(url: &str) -> ContentBlock {
        ContentBlock::ImageUrl {
            image_url: ImageSource {
                url: url.to_string(),
            },
        }
    }

    fn reference_block(items: Vec<ReferenceItem>) -> ContentBlock {
        ContentBlock::Reference { reference: items }
    }

    fn item(content: &str, title: Option<&str>, link: Option<&str>) -> ReferenceItem {
        ReferenceItem {
            content: content.to_string(),
            title: title.map(str::to_string),
            link: link.map(str::to_string),
        }
    }

    #[test]
    fn bare_string_passes_through_on_text_targets() {
        assert_eq!(flatten_content(&TurnContent::Text("hi".to_string())), "hi");
    }

    #[test]
    fn text_blocks_join_with_spaces() {
        let content = TurnContent::Blocks(vec![
            text_block("first"),
            image_block("data:image/png;base64,AAAA"),
            text_block("second"),
        ]);
        assert_eq!(flatten_content(&content), "first second");
    }

    #[test]
    fn references_render_before_the_original_input() {
        let content = TurnContent::Blocks(vec![
            text_block("what changed?"),
            reference_block(vec![item("release notes", Some("T"), Some("L"))]),
        ]);
        assert_eq!(
            flatten_content(&content),
            "\n\n【related references】\n1. release notes\n\nSource: T (L)\n\noriginal input:\nwhat changed?"
        );
    }

    #[test]
    fn reference_items_number_continuously_and_default_fields() {
        let content = TurnContent::Blocks(vec![
            reference_block(vec![
                item("alpha", Some("A"), None),
                item("beta", None, Some("https://b")),
            ]),
            text_block("question"),
        ]);
        let flattened = flatten_content(&content);
        assert!(flattened.contains("1. alpha\n\nSource: A (no link)\n\n"));
        assert!(flattened.contains("2. beta\n\nSource: untitled (https://b)\n\n"));
    }

    #[test]
    fn reference_content_is_clipped_to_4096_characters() {
        let long = "A".repeat(5000);
        let content = TurnContent::Blocks(vec![
            reference_block(vec![item(&long, Some("T"), Some("L"))]),
            text_block("q"),
        ]);
        let flattened = flatten_content(&content);
        assert!(flattened.contains(&"A".repeat(4096)));
        assert!(!flattened.contains(&"A".repeat(4097)));
        assert!(flattened.contains("Source: T (L)"));
    }

    #[test]
    fn clipping_counts_characters_not_bytes() {
        let long = "试".repeat(4100);
        let content = TurnContent::Blocks(vec![reference_block(vec![item(&long, None, None)])]);
        let flattened = flatten_content(&content);
        assert!(flattened.contains(&"试".repeat(4096)));
        assert!(!flattened.contains(&"试".repeat(4097)));
    }

    #[test]
    fn vision_targets_drop_reference_blocks() {
        let turns = [Turn::new(
            Role::User,
            TurnContent::Blocks(vec![
                image_block("data:image/jpeg;base64,BBBB"),
                reference_block(vec![item("ignored", None, None)]),
                text_block("describe"),
            ]),
        )];
        let request = build_request(
            &turns,
            &ModelParameters::default(),
            "zai-org/GLM-4.5V",
            true,
            None,
            true,
        );
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(
            encoded["messages"][0]["content"],
            json!([
                {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,BBBB"}},
                {"type": "text", "text": "describe"}
            ])
        );
    }

    #[test]
    fn vision_targets_wrap_bare_strings_as_text_parts() {
        let turns = [Turn::user("plain question")];
        let request = build_request(
            &turns,
            &ModelParameters::default(),
            "zai-org/GLM-4.5V",
            true,
            None,
            true,
        );
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(
            encoded["messages"][0]["content"],
            json!([{"type": "text", "text": "plain question"}])
        );
    }

    #[test]
    fn text_targets_send_plain_strings() {
        let turns = [
            Turn::user("question"),
            Turn::assistant("answer", Some("reasoning stays local".to_string())),
        ];
        let request = build_request(
            &turns,
            &ModelParameters::default(),
            "deepseek-ai/DeepSeek-V3.1",
            false,
            Some(true),
            true,
        );
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(encoded["messages"][0]["content"], json!("question"));
        assert_eq!(encoded["messages"][1]["content"], json!("answer"));
        assert_eq!(encoded["messages"][1]["role"], json!("assistant"));
        // Stored reasoning is never echoed back to the provider.
        assert!(encoded["messages"][1].get("reasoning").is_none());
    }

    #[test]
    fn request_carries_sampling_parameters() {
        let params = ModelParameters {
            max_tokens: 2048,
            temperature: 1.1,
            top_p: 0.5,
            ..ModelParameters::default()
        };
        let request = build_request(
            &[Turn::user("q")],
            &params,
            "zai-org/GLM-4.5",
            false,
            None,
            false,
        );
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(encoded["model"], json!("zai-org/GLM-4.5"));
        assert_eq!(encoded["max_tokens"], json!(2048));
        assert_eq!(encoded["temperature"], json!(1.1));
        assert_eq!(encoded["top_p"], json!(0.5));
        assert_eq!(encoded["stream"], json!(false));
    }

    #[test]
    fn enable_thinking_is_gated_by_the_allow_list() {
        let params = ModelParameters::default();
        let turns = [Turn::user("q")];
        let cases = [
            ("deepseek-ai/DeepSeek-V3.1", Some(true), Some(json!(true))),
            ("deepseek-ai/DeepSeek-V3.1", Some(false), Some(json!(false))),
            ("deepseek-ai/DeepSeek-V3.1", None, None),
            ("Qwen/Qwen3-235B-A22B-Thinking-2507", Some(true), None),
            ("zai-org/GLM-4.5", Some(false), None),
        ];
        for (model, flag, expected) in cases {
            let request = build_request(&turns, &params, model, false, flag, true);
            let encoded = serde_json::to_value(&request).unwrap();
            match expected {
                Some(value) => assert_eq!(encoded["enable_thinking"], value, "model {model}"),
                None => assert!(
                    encoded.get("enable_thinking").is_none(),
                    "model {model} must omit the field"
                ),
            }
        }
    }

    #[test]
    fn vision_follows_only_the_latest_turn() {
        let image_turn = Turn::new(
            Role::User,
            TurnContent::Blocks(vec![image_block("data:image/png;base64,AAAA")]),
        );
        assert!(wants_vision(&[Turn::user("q"), image_turn.clone()]));
        assert!(!wants_vision(&[
            image_turn,
            Turn::assistant("a picture", None)
        ]));
        assert!(!wants_vision(&[]));
    }

    #[test]
    fn thinking_preference_follows_the_selected_model() {
        assert_eq!(thinking_preference("deepseek-ai/DeepSeek-V3.1"), Some(true));
        assert_eq!(thinking_preference("zai-org/GLM-4.5"), None);
    }

    #[test]
    fn earlier_image_turns_flatten_without_their_images() {
        let turns = [
            Turn::new(
                Role::User,
                TurnContent::Blocks(vec![
                    image_block("data:image/png;base64,AAAA"),
                    text_block("what is shown?"),
                ]),
            ),
            Turn::assistant("a graph", None),
            Turn::user("and in words?"),
        ];
        let request = build_request(
            &turns,
            &ModelParameters::default(),
            "deepseek-ai/DeepSeek-V3.1",
            false,
            Some(true),
            true,
        );
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(encoded["messages"][0]["content"], json!("what is shown?"));
    }

    #[test]
    fn unknown_blocks_are_dropped_on_both_paths() {
        let content = TurnContent::Blocks(vec![
            ContentBlock::Unknown(json!({"type": "audio", "url": "x.ogg"})),
            text_block("hello"),
        ]);
        assert_eq!(flatten_content(&content), "hello");
        let MessageContent::Parts(parts) = vision_content(&content) else {
            panic!("expected parts");
        };
        assert_eq!(parts.len(), 1);
    }
}
