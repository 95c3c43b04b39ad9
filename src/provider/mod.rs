//! LLM provider seam.
//!
//! - [`groq`]: reqwest-backed client for Groq's OpenAI-compatible API
//! - [`sse`]: incremental decoder for the provider's event-stream body
//!
//! A provider hands back a channel of [`CompletionEvent`]s. The channel
//! closing means the provider finished normally.

pub mod groq;
pub mod sse;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::{MAX_TOKENS, TEMPERATURE};
use crate::error::{ProviderError, RelayError};

/// One conversational turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Request body sent to the provider (OpenAI chat completion shape).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub stream: bool,
}

impl CompletionRequest {
    /// Streaming request with the relay's fixed sampling parameters.
    pub fn streaming(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            stream: true,
        }
    }
}

/// Streaming chat completion chunk as delivered by the provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Set when the provider reports a failure inside the stream.
    #[serde(default)]
    pub error: Option<ApiErrorDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// `error` object of an OpenAI-style error envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl StreamChunk {
    /// Chunk carrying a single text delta.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChunkChoice {
                delta: ChunkDelta {
                    role: None,
                    content: Some(content.into()),
                },
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    /// The first choice's text delta, if it is non-empty.
    pub fn text_delta(&self) -> Option<&str> {
        self.choices
            .first()?
            .delta
            .content
            .as_deref()
            .filter(|text| !text.is_empty())
    }
}

/// An event on a provider stream.
#[derive(Debug, Clone)]
pub enum CompletionEvent {
    /// An incremental chunk.
    Chunk(StreamChunk),
    /// The stream failed after it started; no more events follow.
    Error(ProviderError),
}

/// Receiving end of a provider stream.
pub type CompletionStream = mpsc::Receiver<CompletionEvent>;

/// Something that can stream chat completions.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Start a streaming completion.
    ///
    /// Failures before the first byte of the stream are returned directly;
    /// later failures arrive as [`CompletionEvent::Error`].
    async fn stream_chat(
        &self,
        api_key: &str,
        request: CompletionRequest,
    ) -> Result<CompletionStream, RelayError>;
}
