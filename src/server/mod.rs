//! HTTP server for the chat relay.
//!
//! - [`api`]: Request/response types and route handlers
//! - [`streaming`]: SSE framing of provider output

pub mod api;
pub mod streaming;
