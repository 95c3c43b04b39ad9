//! Groq chat completion client.
//!
//! Sends one streaming request per call and decodes the event-stream body on
//! a background task, forwarding chunks through a bounded channel.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{ProviderError, RelayError};
use crate::provider::sse::{SseDecoder, SseFrame};
use crate::provider::{
    ApiErrorDetail, ChatProvider, CompletionEvent, CompletionRequest, CompletionStream,
    StreamChunk,
};

/// Chunks are handed over one at a time.
const CHANNEL_CAPACITY: usize = 1;

/// Client for an OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone)]
pub struct GroqClient {
    http: reqwest::Client,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorDetail,
}

impl GroqClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl ChatProvider for GroqClient {
    async fn stream_chat(
        &self,
        api_key: &str,
        request: CompletionRequest,
    ) -> Result<CompletionStream, RelayError> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            }
            .into());
        }

        debug!(status = status.as_u16(), "Provider stream opened");

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(forward_stream(response, tx));
        Ok(rx)
    }
}

fn send_error(e: reqwest::Error) -> RelayError {
    if e.is_builder() {
        RelayError::Internal(e.to_string())
    } else {
        ProviderError::Connection(e.to_string()).into()
    }
}

/// Human-readable message from an error response body.
///
/// Uses `error.message` from an OpenAI-style envelope, else the raw body.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => body.trim().to_string(),
    }
}

/// Decode the response body and push chunks until `[DONE]`, end of body,
/// failure, or the receiver going away.
async fn forward_stream(response: reqwest::Response, tx: mpsc::Sender<CompletionEvent>) {
    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::new();

    while let Some(item) = body.next().await {
        let bytes = match item {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tx
                    .send(CompletionEvent::Error(ProviderError::Stream(e.to_string())))
                    .await;
                return;
            }
        };

        for frame in decoder.push(&bytes) {
            if !forward_frame(frame, &tx).await {
                return;
            }
        }
    }

    if let Some(frame) = decoder.finish() {
        forward_frame(frame, &tx).await;
    }
}

/// Returns `false` once the stream should stop.
async fn forward_frame(frame: SseFrame, tx: &mpsc::Sender<CompletionEvent>) -> bool {
    let data = match frame {
        SseFrame::Done => return false,
        SseFrame::Data(data) => data,
    };

    let event = match serde_json::from_str::<StreamChunk>(&data) {
        Ok(StreamChunk {
            error: Some(error), ..
        }) => {
            warn!(kind = ?error.kind, "Provider reported an error mid-stream");
            CompletionEvent::Error(ProviderError::Stream(error.message))
        }
        Ok(chunk) => CompletionEvent::Chunk(chunk),
        Err(e) => CompletionEvent::Error(ProviderError::Stream(format!(
            "undecodable chunk: {e}"
        ))),
    };

    let keep_going = matches!(event, CompletionEvent::Chunk(_));
    if tx.send(event).await.is_err() {
        debug!("Client went away, dropping provider stream");
        return false;
    }
    keep_going
}
