//! Error types shared by the provider client and the HTTP layer.
//!
//! Every failure on the `/chat` path ends up as a [`RelayError`], which the
//! router renders as HTTP 500 with a `{"detail": ...}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Failures reported by (or while talking to) the LLM provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider answered with a non-success status.
    #[error("Error code: {status} - {message}")]
    Status { status: u16, message: String },

    /// The request never got a response.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The response stream broke or carried something undecodable.
    #[error("Stream error: {0}")]
    Stream(String),
}

/// Errors surfaced by the relay to its clients.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Groq API key not configured")]
    MissingApiKey,

    #[error("Groq API error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// JSON error envelope.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let detail = self.to_string();
        match &self {
            RelayError::MissingApiKey => tracing::error!("{detail}"),
            RelayError::Provider(e) => tracing::error!(error = %e, "Groq API error"),
            RelayError::Internal(e) => tracing::error!(error = %e, "Internal server error"),
        }

        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { detail })).into_response()
    }
}
