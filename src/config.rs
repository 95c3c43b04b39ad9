//! Runtime configuration for qa-chat-relay.
//!
//! The provider credential comes from the environment (optionally seeded from
//! a dotenv file). Endpoint, model and sampling parameters are fixed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::error::RelayError;

/// Environment variable holding the Groq API key.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Groq's OpenAI-compatible chat completion endpoint.
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Model every request is sent to.
pub const MODEL_NAME: &str = "llama3-8b-8192";

pub const TEMPERATURE: f64 = 0.7;
pub const MAX_TOKENS: u32 = 1024;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "qa-chat-relay", about = "Streaming chat relay in front of the Groq API")]
pub struct Cli {
    /// HTTP listen address.
    #[arg(long, default_value = "0.0.0.0:8000")]
    pub listen: String,

    /// Dotenv file to read the API key from.
    #[arg(long, default_value = ".env")]
    pub env_file: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

/// Process-wide settings. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Provider credential. `None` when unset or empty.
    pub api_key: Option<String>,

    /// Chat completion endpoint.
    pub api_url: String,

    /// Model identifier.
    pub model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: GROQ_API_URL.to_string(),
            model: MODEL_NAME.to_string(),
        }
    }
}

impl Settings {
    /// Settings with the given credential and the fixed endpoint/model.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            ..Self::default()
        }
    }

    /// Point the settings at a different endpoint (used by tests).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::new(lookup(API_KEY_ENV))
    }

    /// Build settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from the process environment, falling back to the
    /// given dotenv file for anything the environment does not set.
    ///
    /// Never fails: a missing file or unparsable lines are logged and skipped.
    pub fn load(env_file: &Path) -> Self {
        let file_vars = read_env_file(env_file);
        Self::layered(|key| std::env::var(key).ok(), &file_vars)
    }

    /// Settings from `env`, with `file_vars` filling in what `env` lacks.
    pub fn layered<F>(env: F, file_vars: &HashMap<String, String>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(|key| env(key).or_else(|| file_vars.get(key).cloned()))
    }

    /// The credential, or a configuration error if it was never supplied.
    pub fn api_key(&self) -> Result<&str, RelayError> {
        self.api_key.as_deref().ok_or(RelayError::MissingApiKey)
    }
}

/// Variables defined in a dotenv file. Lines that fail to parse are skipped.
pub fn read_env_file(path: &Path) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) => {
            tracing::warn!("Env file not readable at {:?} ({e}), using process environment only", path);
            return vars;
        }
    };

    for item in iter {
        match item {
            Ok((key, value)) => {
                vars.insert(key, value);
            }
            Err(dotenvy::Error::Io(e)) => {
                tracing::warn!("Stopped reading {:?}: {e}", path);
                break;
            }
            Err(e) => tracing::warn!("Skipping line in {:?}: {e}", path),
        }
    }
    vars
}
