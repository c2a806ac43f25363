//! Conversation title generation
//!
//! Names a conversation after its first exchange: a small non-streaming
//! completion extracts a topic from the user's opening prompt, then the
//! topic is scrubbed into a filesystem-safe title. The resulting file name
//! is `MMDDHHmm_{title}.json`, falling back to `untitled` when nothing
//! usable comes back.

use std::fmt;

use chrono::Local;

use crate::api::CompletionResponse;
use crate::core::adapter::build_request;
use crate::core::builtin_models::TITLE_MODEL;
use crate::core::config::ModelParameters;
use crate::core::message::Turn;
use crate::utils::url::completions_url;

const NAMING_SYSTEM_PROMPT: &str = "You are a conversation naming assistant. \
     Extract keywords from the conversation to use as the transcript file name, \
     fifteen characters or fewer.";
const TITLE_MAX_CHARS: usize = 15;
const UNTITLED: &str = "untitled";
const TIMESTAMP_FORMAT: &str = "%m%d%H%M";

#[derive(Debug)]
pub enum TitleError {
    /// The request could not be sent or its body could not be decoded.
    Request(reqwest::Error),

    /// The endpoint answered with a non-success status.
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl fmt::Display for TitleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TitleError::Request(source) => write!(f, "Title request failed: {source}"),
            TitleError::Status { status, body } => {
                write!(f, "Title request failed with status {status}: {body}")
            }
        }
    }
}

impl std::error::Error for TitleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TitleError::Request(source) => Some(source),
            TitleError::Status { .. } => None,
        }
    }
}

/// Asks the title model to name the conversation and returns the file name
/// to save it under. `seed_text` is the user's first prompt.
pub async fn generate_filename(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    params: &ModelParameters,
    seed_text: &str,
) -> Result<String, TitleError> {
    let turns = [
        Turn::system(NAMING_SYSTEM_PROMPT),
        Turn::user(format!(
            "Extract the topic of the conversation (output only the topic itself): {seed_text}"
        )),
    ];
    let request = build_request(&turns, params, TITLE_MODEL, false, Some(false), false);

    let response = client
        .post(completions_url(base_url))
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&request)
        .send()
        .await
        .map_err(TitleError::Request)?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(TitleError::Status { status, body });
    }

    let completion: CompletionResponse = response.json().await.map_err(TitleError::Request)?;
    let raw_title = completion
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_deref())
        .unwrap_or_default();
    Ok(compose_filename(&sanitize_title(raw_title)))
}

/// Scrubs a model-produced title into a file name component: trim, drop
/// characters filesystems reject, cap at fifteen characters.
pub fn sanitize_title(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !is_illegal_filename_char(*c))
        .take(TITLE_MAX_CHARS)
        .collect()
}

/// Stamps a title into a conversation file name. An empty title becomes the
/// untitled fallback.
pub fn compose_filename(title: &str) -> String {
    let timestamp = Local::now().format(TIMESTAMP_FORMAT);
    if title.is_empty() {
        format!("{timestamp}_{UNTITLED}.json")
    } else {
        format!("{timestamp}_{title}.json")
    }
}

pub fn untitled_filename() -> String {
    compose_filename("")
}

fn is_illegal_filename_char(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\t' | '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'
    )
}
