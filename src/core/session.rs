//! Conversation session state
//!
//! Tracks the active transcript, its saved name (once it has one), and the
//! session parameters. The session performs no network work; the chat loop
//! feeds it finished turns and asks it to persist.

use crate::core::config::ModelParameters;
use crate::core::message::{ContentBlock, ImageSource, Role, Turn, TurnContent};
use crate::core::store::{ConversationStore, StoreError};

/// Text shown in place of an answer when a request produced nothing.
pub const FAILURE_NOTICE: &str = "Response generation failed";

pub struct ChatSession {
    store: ConversationStore,
    turns: Vec<Turn>,
    conversation_id: Option<String>,
    pub params: ModelParameters,
}

impl ChatSession {
    pub fn new(store: ConversationStore, params: ModelParameters) -> Self {
        Self {
            store,
            turns: Vec::new(),
            conversation_id: None,
            params,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn is_named(&self) -> bool {
        self.conversation_id.is_some()
    }

    /// Drops the active transcript and starts an unnamed conversation.
    pub fn begin_conversation(&mut self) {
        self.turns.clear();
        self.conversation_id = None;
    }

    /// Replaces the active transcript with a saved one.
    pub fn open(&mut self, id: &str) -> Result<(), StoreError> {
        let turns = self.store.load(id)?;
        self.turns = turns;
        self.conversation_id = Some(id.to_string());
        Ok(())
    }

    /// Deletes a saved conversation. Deleting the open one resets the
    /// session to a fresh conversation.
    pub fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        self.store.delete(id)?;
        if self.conversation_id.as_deref() == Some(id) {
            self.begin_conversation();
        }
        Ok(())
    }

    pub fn list_saved(&self) -> Result<Vec<String>, StoreError> {
        self.store.list()
    }

    /// Appends the user's prompt. With attachments the turn body is a block
    /// list (images first, then the text); without, it stays a bare string.
    pub fn push_user_turn(&mut self, text: &str, image_urls: Vec<String>) {
        let content = if image_urls.is_empty() {
            TurnContent::Text(text.to_string())
        } else {
            let mut blocks: Vec<ContentBlock> = image_urls
                .into_iter()
                .map(|url| ContentBlock::ImageUrl {
                    image_url: ImageSource { url },
                })
                .collect();
            blocks.push(ContentBlock::Text {
                text: text.to_string(),
            });
            TurnContent::Blocks(blocks)
        };
        self.turns.push(Turn::new(Role::User, content));
    }

    /// Appends the assistant's reply, complete or partial.
    pub fn finalize_assistant(&mut self, answer: String, reasoning: Option<String>) {
        self.turns.push(Turn::assistant(answer, reasoning));
    }

    /// Appends a visible failure turn; the reason lands in the reasoning
    /// field so the transcript records what went wrong.
    pub fn record_transport_failure(&mut self, reason: &str) {
        self.turns
            .push(Turn::assistant(FAILURE_NOTICE, Some(format!("Error: {reason}"))));
    }

    /// Adopts a generated file name, unless the conversation already has one.
    pub fn adopt_name(&mut self, filename: String) {
        if self.conversation_id.is_none() {
            self.conversation_id = Some(filename);
        }
    }

    /// Writes the transcript under its name. Unnamed or empty conversations
    /// are not written.
    pub fn persist(&self) -> Result<(), StoreError> {
        match &self.conversation_id {
            Some(id) if !self.turns.is_empty() => self.store.save(id, &self.turns),
            _ => Ok(()),
        }
    }
}
