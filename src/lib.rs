//! Confab is a line-oriented terminal chat client for multimodal AI
//! conversations over an OpenAI-compatible streaming API.
//!
//! The crate is organized in a few layers:
//!
//! - [`core`] holds the conversation model and everything that operates on
//!   it: the request adapter, the stream decoder, the transport task,
//!   conversation persistence, title generation, session state, and
//!   configuration.
//! - [`api`] defines the wire types exchanged with the completions
//!   endpoint.
//! - [`commands`] interprets slash commands typed at the prompt.
//! - [`cli`] parses arguments and runs the interactive chat loop.
//!
//! The binary entrypoint (`src/main.rs`) routes through [`cli::run`].

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod utils;
