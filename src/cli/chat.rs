//! Interactive chat loop
//!
//! Drives the terminal conversation: read a line, run slash commands, send
//! chat messages, print the streamed reply as it arrives, then name and
//! save the conversation.

use std::env;
use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;

use tokio::io::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;

use crate::commands::{process_input, CommandResult};
use crate::core::adapter::{build_request, thinking_preference, wants_vision};
use crate::core::builtin_models::{API_KEY_ENV, BASE_URL_ENV, DEFAULT_BASE_URL, VISION_MODEL};
use crate::core::chat_stream::{ChatStreamService, StreamMessage, StreamParams};
use crate::core::config::Config;
use crate::core::decoder::{StreamDecoder, StreamEvent};
use crate::core::session::ChatSession;
use crate::core::store::ConversationStore;
use crate::core::title::{generate_filename, untitled_filename};

/// Mutable state shared between the loop and the command handlers.
pub struct ChatState {
    pub session: ChatSession,
    pub staged_images: Vec<StagedImage>,
}

/// An attachment staged for the next message.
pub struct StagedImage {
    pub name: String,
    pub data_uri: String,
}

pub async fn run_chat(
    model_override: Option<String>,
    history_dir_override: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let api_key = env::var(API_KEY_ENV).map_err(|_| {
        format!(
            "Error: {API_KEY_ENV} environment variable not set\n\n\
             Please set your API key:\n\
             export {API_KEY_ENV}=\"your-api-key-here\"\n\n\
             Optionally, you can also set a custom base URL:\n\
             export {BASE_URL_ENV}=\"{DEFAULT_BASE_URL}\""
        )
    })?;
    let base_url = env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

    let config = Config::load()?;
    let mut params = config.parameters();
    if let Some(model) = model_override {
        params.model = model;
    }
    let history_dir = history_dir_override.unwrap_or_else(|| config.history_dir());

    eprintln!(
        "Starting confab (model: {}, endpoint: {base_url})",
        params.model
    );
    eprintln!("Type a message to chat, /help for commands, /quit to exit");

    let client = reqwest::Client::new();
    let mut state = ChatState {
        session: ChatSession::new(ConversationStore::new(history_dir), params),
        staged_images: Vec::new(),
    };

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt(&state)?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match process_input(&mut state, &line) {
            CommandResult::Continue => {}
            CommandResult::Quit => break,
            CommandResult::ProcessAsMessage(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    continue;
                }
                send_message(&mut state, &client, &base_url, &api_key, &text).await;
            }
        }
    }
    Ok(())
}

fn print_prompt(state: &ChatState) -> io::Result<()> {
    let mut stdout = io::stdout();
    if state.staged_images.is_empty() {
        write!(stdout, "> ")?;
    } else {
        write!(stdout, "[{} attached] > ", state.staged_images.len())?;
    }
    stdout.flush()
}

/// Sends one user message and streams the reply into the terminal.
///
/// The user turn is recorded before the request goes out, and the exchange
/// is named and saved afterwards even when the request fails; a failed
/// request leaves a visible failure turn instead of silently vanishing.
async fn send_message(
    state: &mut ChatState,
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    text: &str,
) {
    let staged: Vec<String> = std::mem::take(&mut state.staged_images)
        .into_iter()
        .map(|image| image.data_uri)
        .collect();
    state.session.push_user_turn(text, staged);

    let use_vision = wants_vision(state.session.turns());
    let selected_model = state.session.params.model.clone();
    let target_model = if use_vision {
        VISION_MODEL
    } else {
        selected_model.as_str()
    };
    let request = build_request(
        state.session.turns(),
        &state.session.params,
        target_model,
        use_vision,
        thinking_preference(&selected_model),
        true,
    );

    let (service, mut rx) = ChatStreamService::new();
    let cancel_token = CancellationToken::new();
    service.spawn_stream(StreamParams {
        client: client.clone(),
        base_url: base_url.to_string(),
        api_key: api_key.to_string(),
        request,
        cancel_token: cancel_token.clone(),
    });

    let mut decoder = StreamDecoder::new();
    let mut printer = StreamPrinter::new();
    let mut failure: Option<String> = None;

    'receive: while let Some(message) = rx.recv().await {
        match message {
            StreamMessage::Line(line) => {
                for event in decoder.feed(&line) {
                    match event {
                        StreamEvent::AnswerDelta(delta) => printer.answer(&delta),
                        StreamEvent::ReasoningDelta(delta) => printer.reasoning(&delta),
                        StreamEvent::End => break 'receive,
                    }
                }
            }
            StreamMessage::Failed(reason) => failure = Some(reason),
            StreamMessage::Closed => break,
        }
    }
    cancel_token.cancel();
    printer.finish();

    let had_output = decoder.has_output();
    let (answer, reasoning) = decoder.finish();
    match failure {
        Some(reason) if !had_output => {
            eprintln!("Request failed: {reason}");
            state.session.record_transport_failure(&reason);
        }
        Some(reason) => {
            // The connection dropped mid-reply; keep what already streamed.
            eprintln!("Stream interrupted: {reason}");
            state.session.finalize_assistant(answer, reasoning);
        }
        None => {
            state.session.finalize_assistant(answer, reasoning);
        }
    }

    if !state.session.is_named() {
        let filename =
            match generate_filename(client, base_url, api_key, &state.session.params, text).await {
                Ok(filename) => filename,
                Err(err) => {
                    tracing::warn!("title generation failed: {err}");
                    untitled_filename()
                }
            };
        state.session.adopt_name(filename);
    }
    if let Err(err) = state.session.persist() {
        eprintln!("Could not save the conversation: {err}");
    }
}

/// Prints streamed deltas, labelling the reasoning section so it reads
/// apart from the answer.
struct StreamPrinter {
    section: Section,
}

enum Section {
    Idle,
    Reasoning,
    Answer,
}

impl StreamPrinter {
    fn new() -> Self {
        Self {
            section: Section::Idle,
        }
    }

    fn reasoning(&mut self, delta: &str) {
        if !matches!(self.section, Section::Reasoning) {
            println!("[reasoning]");
            self.section = Section::Reasoning;
        }
        print_flush(delta);
    }

    fn answer(&mut self, delta: &str) {
        if matches!(self.section, Section::Reasoning) {
            println!("\n[answer]");
        }
        self.section = Section::Answer;
        print_flush(delta);
    }

    fn finish(&mut self) {
        if !matches!(self.section, Section::Idle) {
            println!();
        }
    }
}

fn print_flush(text: &str) {
    let mut stdout = io::stdout();
    let _ = stdout.write_all(text.as_bytes());
    let _ = stdout.flush();
}
