pub mod adapter;
pub mod builtin_models;
pub mod chat_stream;
pub mod config;
pub mod decoder;
pub mod message;
pub mod session;
pub mod store;
pub mod title;
