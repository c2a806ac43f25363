//! Conversation data model
//!
//! Transcripts are sequences of [`Turn`]s. A turn's content is either a bare
//! string or an ordered list of typed blocks (text, image attachments,
//! retrieved references). Unrecognized block types survive load and save
//! untouched so transcripts written by newer builds are not destroyed by
//! older ones.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference block item: retrieved source material attached to a user turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceItem {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(deserialize_with = "string_or_json_text")]
    pub url: String,
}

/// One typed block inside a structured turn body.
///
/// The catch-all variant keeps the raw JSON of block types this build does
/// not know about; they round-trip through persistence verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageSource },
    #[serde(rename = "reference")]
    Reference { reference: Vec<ReferenceItem> },
    #[serde(untagged)]
    Unknown(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl TurnContent {
    pub fn has_image(&self) -> bool {
        match self {
            TurnContent::Text(_) => false,
            TurnContent::Blocks(blocks) => blocks
                .iter()
                .any(|block| matches!(block, ContentBlock::ImageUrl { .. })),
        }
    }
}

impl From<String> for TurnContent {
    fn from(text: String) -> Self {
        TurnContent::Text(text)
    }
}

impl From<&str> for TurnContent {
    fn from(text: &str) -> Self {
        TurnContent::Text(text.to_string())
    }
}

/// Raised when raw turn content is neither a string nor a block sequence.
#[derive(Debug, PartialEq, Eq)]
pub struct InvalidTurnShape {
    found: &'static str,
}

impl fmt::Display for InvalidTurnShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid turn content: expected a string or an array of blocks, found {}",
            self.found
        )
    }
}

impl std::error::Error for InvalidTurnShape {}

/// Normalizes untrusted turn content into the typed form.
///
/// Strings stay strings, arrays become block lists (elements of unknown
/// shape are preserved as [`ContentBlock::Unknown`]), and every other JSON
/// shape is rejected.
pub fn normalize_content(raw: Value) -> Result<TurnContent, InvalidTurnShape> {
    let found = match raw {
        Value::String(text) => return Ok(TurnContent::Text(text)),
        Value::Array(items) => {
            let blocks = items
                .into_iter()
                .map(|item| {
                    serde_json::from_value(item.clone()).unwrap_or(ContentBlock::Unknown(item))
                })
                .collect();
            return Ok(TurnContent::Blocks(blocks));
        }
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::Object(_) => "an object",
    };
    Err(InvalidTurnShape { found })
}

/// One conversation turn. The role is fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    pub content: TurnContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<TurnContent>) -> Self {
        Self {
            role,
            content: content.into(),
            reasoning: None,
        }
    }

    pub fn system(content: impl Into<TurnContent>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<TurnContent>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(answer: impl Into<String>, reasoning: Option<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Text(answer.into()),
            reasoning,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    pub fn has_image(&self) -> bool {
        self.content.has_image()
    }
}

// Image attachments are stored as plain URL strings (usually data URIs).
// Older transcripts carried richer objects here; they collapse to their JSON
// text on load and are never widened back.
fn string_or_json_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(url) => url,
        other => other.to_string(),
    })
}
