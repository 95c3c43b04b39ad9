//! qa-chat-relay: streaming chat relay in front of Groq.
//!
//! Accepts a conversation over HTTP, forwards it to Groq's chat completion
//! API in streaming mode, and re-emits each text delta to the caller as a
//! server-sent event.

pub mod config;
pub mod error;
pub mod provider;
pub mod server;
