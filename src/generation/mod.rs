// Generation module
// Prompt construction and the chat-completion client

pub mod prompts;


use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::GenerationConfig;

pub use prompts::{Prompt, SummaryStyle, Task, assemble_context, build_prompt};

/// Failures of a single text-generation call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Authentication with the generation service failed")]
    Authentication,

    #[error("Access to the generation model was denied")]
    AccessDenied,

    #[error("Generation request rejected: {0}")]
    Validation(String),

    #[error("Generation service error (HTTP {status}): {message}")]
    Service { status: u16, message: String },

    #[error("Could not reach the generation service: {0}")]
    Transport(String),

    #[error("Generation service returned no choices")]
    EmptyResponse,

    #[error("Generation service returned an unreadable response: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    /// Message suitable for showing to an end user
    #[inline]
    pub fn user_message(&self) -> String {
        match *self {
            GenerationError::Authentication => {
                "Authentication failed. Please check your API key.".to_string()
            }
            GenerationError::AccessDenied => {
                "Access denied. Your API key does not have permission to use this model."
                    .to_string()
            }
            GenerationError::Validation(ref message) => {
                format!("The request was rejected as invalid: {message}")
            }
            GenerationError::Service { status, .. } => format!(
                "The generation service returned an error (HTTP {status}). Please try again later."
            ),
            GenerationError::Transport(_) => {
                "Could not reach the generation service. Please check your network connection."
                    .to_string()
            }
            GenerationError::EmptyResponse => {
                "The generation service returned an empty answer.".to_string()
            }
            GenerationError::InvalidResponse(_) => {
                "The generation service returned a response that could not be read.".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One chat-completion call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Per-call overrides of the configured sampling settings
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Blocking client for an OpenAI/Mistral style chat-completions endpoint
#[derive(Debug, Clone)]
pub struct GenerationClient {
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
    agent: ureq::Agent,
}

impl GenerationClient {
    #[inline]
    pub fn new(config: &GenerationConfig) -> crate::Result<Self> {
        Ok(Self {
            endpoint: config.endpoint_url()?,
            model: config.model.clone(),
            api_key: config.api_key(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
        })
    }

    #[inline]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Request for `prompt` using configured settings unless overridden
    #[inline]
    pub fn request(&self, prompt: Prompt, options: GenerationOptions) -> GenerationRequest {
        GenerationRequest {
            messages: prompt.into_messages(),
            temperature: options.temperature.unwrap_or(self.temperature),
            max_tokens: options.max_tokens.unwrap_or(self.max_tokens),
        }
    }

    /// Single attempt; failures are classified, never retried
    #[inline]
    pub fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = serde_json::to_string(&ChatRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        })
        .map_err(|e| GenerationError::Validation(e.to_string()))?;

        debug!(
            "Calling generation model {} with {} messages",
            self.model,
            request.messages.len()
        );

        let mut builder = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", &format!("Bearer {key}"));
        }

        let mut response = builder
            .send(&body)
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            warn!("Generation request failed with HTTP {}", status);
            return Err(classify_status(status, text.trim()));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)
    }
}

fn classify_status(status: u16, message: &str) -> GenerationError {
    match status {
        401 => GenerationError::Authentication,
        403 => GenerationError::AccessDenied,
        400 | 422 => GenerationError::Validation(message.to_string()),
        _ => GenerationError::Service {
            status,
            message: message.to_string(),
        },
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}
