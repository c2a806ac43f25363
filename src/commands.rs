//! Slash-command handling for the chat loop
//!
//! Input starting with `/` is interpreted here; anything else is passed
//! back to the caller to be sent as a chat message. Command feedback is
//! printed directly since the loop owns the terminal between prompts.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::cli::chat::{ChatState, StagedImage};
use crate::core::builtin_models::CHAT_MODELS;
use crate::core::config::ParameterKey;

/// How many saved conversations `/list` prints before summarizing the rest.
const LIST_DISPLAY_LIMIT: usize = 10;

pub enum CommandResult {
    Continue,
    ProcessAsMessage(String),
    Quit,
}

pub fn process_input(state: &mut ChatState, input: &str) -> CommandResult {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return CommandResult::ProcessAsMessage(input.to_string());
    }

    let mut parts = trimmed.split_whitespace();
    let command = parts.next().unwrap_or("");
    let args: Vec<&str> = parts.collect();

    match command {
        "/help" => {
            print_help();
            CommandResult::Continue
        }
        "/quit" | "/exit" => CommandResult::Quit,
        "/new" => {
            state.session.begin_conversation();
            state.staged_images.clear();
            println!("Started a new conversation.");
            CommandResult::Continue
        }
        "/list" => {
            list_conversations(state);
            CommandResult::Continue
        }
        "/open" => {
            open_conversation(state, &args);
            CommandResult::Continue
        }
        "/delete" => {
            delete_conversation(state, &args);
            CommandResult::Continue
        }
        "/model" => {
            set_model(state, &args);
            CommandResult::Continue
        }
        "/set" => {
            set_parameter(state, &args);
            CommandResult::Continue
        }
        "/search" => {
            toggle_search(state, &args);
            CommandResult::Continue
        }
        "/image" => {
            stage_image(state, &args);
            CommandResult::Continue
        }
        _ => {
            println!("Unknown command '{command}'. Type /help for the command list.");
            CommandResult::Continue
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /new                  start a new conversation");
    println!("  /list                 list saved conversations, newest first");
    println!("  /open <n|name>        open a saved conversation");
    println!("  /delete <n|name>      delete a saved conversation");
    println!("  /model [id]           show or change the chat model");
    println!("  /set [key value]      show or change max-tokens, temperature, top-p");
    println!("  /search [on|off]      toggle the web search flag");
    println!("  /image <path>         attach a .png/.jpg/.jpeg to the next message");
    println!("  /quit                 exit");
}

fn list_conversations(state: &ChatState) {
    let ids = match state.session.list_saved() {
        Ok(ids) => ids,
        Err(err) => {
            println!("Could not list conversations: {err}");
            return;
        }
    };
    if ids.is_empty() {
        println!("No saved conversations.");
        return;
    }
    for (index, id) in ids.iter().take(LIST_DISPLAY_LIMIT).enumerate() {
        let marker = if state.session.conversation_id() == Some(id.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{marker}{:>3}. {id}", index + 1);
    }
    if ids.len() > LIST_DISPLAY_LIMIT {
        println!("    ... and {} more", ids.len() - LIST_DISPLAY_LIMIT);
    }
}

fn open_conversation(state: &mut ChatState, args: &[&str]) {
    let [target] = args else {
        println!("Usage: /open <number|name>");
        return;
    };
    let Some(id) = resolve_conversation(state, target) else {
        println!("No saved conversation matches '{target}'.");
        return;
    };
    match state.session.open(&id) {
        Ok(()) => {
            state.staged_images.clear();
            println!("Opened {id} ({} turns).", state.session.turns().len());
        }
        Err(err) => println!("Could not open '{id}': {err}"),
    }
}

fn delete_conversation(state: &mut ChatState, args: &[&str]) {
    let [target] = args else {
        println!("Usage: /delete <number|name>");
        return;
    };
    let Some(id) = resolve_conversation(state, target) else {
        println!("No saved conversation matches '{target}'.");
        return;
    };
    match state.session.delete(&id) {
        Ok(()) => println!("Deleted {id}."),
        Err(err) => println!("Could not delete '{id}': {err}"),
    }
}

/// Accepts either a 1-based index into the `/list` ordering or a file name
/// (the `.json` suffix may be left off).
fn resolve_conversation(state: &ChatState, target: &str) -> Option<String> {
    let ids = state.session.list_saved().ok()?;
    if let Ok(index) = target.parse::<usize>() {
        if (1..=ids.len()).contains(&index) {
            return Some(ids[index - 1].clone());
        }
        return None;
    }
    let with_suffix = format!("{target}.json");
    ids.iter()
        .find(|id| *id == target || **id == with_suffix)
        .cloned()
}

fn set_model(state: &mut ChatState, args: &[&str]) {
    match args {
        [] => {
            println!("Current model: {}", state.session.params.model);
            println!("Available models:");
            for model in CHAT_MODELS {
                println!("  {model}");
            }
        }
        [model] => match state.session.params.set(ParameterKey::Model, model) {
            Ok(()) => println!("Model set to {model}."),
            Err(err) => println!("{err}"),
        },
        _ => println!("Usage: /model [id]"),
    }
}

fn set_parameter(state: &mut ChatState, args: &[&str]) {
    match args {
        [] => {
            let params = &state.session.params;
            println!("model: {}", params.model);
            println!("max-tokens: {}", params.max_tokens);
            println!("temperature: {}", params.temperature);
            println!("top-p: {}", params.top_p);
            println!(
                "web search: {}",
                if params.web_search_enabled { "on" } else { "off" }
            );
        }
        [key, value] => {
            let Some(key) = ParameterKey::parse(key) else {
                println!("Unknown setting '{key}'. Keys: model, max-tokens, temperature, top-p.");
                return;
            };
            match state.session.params.set(key, value) {
                Ok(()) => println!("{} set to {value}.", key.as_str()),
                Err(err) => println!("{err}"),
            }
        }
        _ => println!("Usage: /set [key value]"),
    }
}

fn toggle_search(state: &mut ChatState, args: &[&str]) {
    let enabled = match args {
        [] => !state.session.params.web_search_enabled,
        ["on"] => true,
        ["off"] => false,
        _ => {
            println!("Usage: /search [on|off]");
            return;
        }
    };
    state.session.params.web_search_enabled = enabled;
    println!("Web search {}.", if enabled { "on" } else { "off" });
}

fn stage_image(state: &mut ChatState, args: &[&str]) {
    let [path] = args else {
        println!("Usage: /image <path>");
        return;
    };
    match load_image(Path::new(path)) {
        Ok(image) => {
            println!("Attached {} ({} staged).", image.name, state.staged_images.len() + 1);
            state.staged_images.push(image);
        }
        Err(err) => println!("Could not attach '{path}': {err}"),
    }
}

/// Reads an image file into a data URI. Only the formats the vision model
/// accepts are allowed.
fn load_image(path: &Path) -> Result<StagedImage, String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let mime = match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => return Err("only .png, .jpg and .jpeg files can be attached".to_string()),
    };
    let bytes = fs::read(path).map_err(|err| err.to_string())?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(StagedImage {
        name,
        data_uri: format!("data:{mime};base64,{}", BASE64.encode(bytes)),
    })
}
