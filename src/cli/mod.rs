//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the
//! appropriate commands.

pub mod chat;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::chat::run_chat;
use crate::core::config::{Config, ParameterKey};
use crate::core::store::ConversationStore;

#[derive(Parser)]
#[command(name = "confab")]
#[command(about = "A terminal chat client for multimodal AI conversations")]
#[command(
    long_about = "Confab is a line-oriented terminal chat client for OpenAI-compatible \
streaming APIs. Replies stream into the terminal as they arrive, reasoning output is \
printed separately from the answer, and every conversation is saved as a JSON \
transcript that can be reopened later.\n\n\
Environment Variables:\n\
  SILICONFLOW_API_KEY    Your API key (required to chat)\n\
  SILICONFLOW_BASE_URL   Custom API base URL (optional)\n\n\
Chat commands:\n\
  /help             Show the command list\n\
  /new              Start a new conversation\n\
  /open <n|name>    Reopen a saved conversation\n\
  /image <path>     Attach an image to the next message\n\
  /quit             Exit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use for this session
    #[arg(short = 'm', long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Directory holding conversation transcripts
    #[arg(long, value_name = "DIR")]
    pub history_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive chat (default)
    Chat,
    /// List saved conversations, newest first
    List,
    /// Delete a saved conversation
    Delete {
        /// Conversation file name as shown by `confab list`
        id: String,
    },
    /// Set a persistent default (model, max-tokens, temperature, top-p)
    Set {
        /// Setting key
        key: String,
        /// Value to store
        value: String,
    },
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(args.model, args.history_dir).await,
        Commands::List => {
            let store = open_store(args.history_dir)?;
            let ids = store.list()?;
            if ids.is_empty() {
                println!("No saved conversations.");
            }
            for id in ids {
                println!("{id}");
            }
            Ok(())
        }
        Commands::Delete { id } => {
            let store = open_store(args.history_dir)?;
            store.delete(&id)?;
            println!("Deleted {id}.");
            Ok(())
        }
        Commands::Set { key, value } => {
            let Some(key) = ParameterKey::parse(&key) else {
                return Err(format!(
                    "unknown setting '{key}'; keys: model, max-tokens, temperature, top-p"
                )
                .into());
            };
            let mut config = Config::load()?;
            config.set_default(key, &value)?;
            config.save()?;
            println!("Set {} to {value}.", key.as_str());
            Ok(())
        }
    }
}

fn open_store(history_dir: Option<PathBuf>) -> Result<ConversationStore, Box<dyn Error>> {
    let dir = match history_dir {
        Some(dir) => dir,
        None => Config::load()?.history_dir(),
    };
    Ok(ConversationStore::new(dir))
}
