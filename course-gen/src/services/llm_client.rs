//! Generative model client
//!
//! [`GenerativeCall`] is the seam every pipeline step calls through: one
//! system prompt, one user prompt, one schema, one raw JSON payload back.
//! Callers validate the payload themselves; the client only guarantees it
//! received a JSON object.
//!
//! [`AnthropicClient`] implements it against the Messages API, forcing a
//! single tool call whose `input_schema` is the descriptor's JSON Schema so
//! the model answers with structured input instead of prose.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

use course_common::config::LlmConfig;

use crate::validators::SchemaDescriptor;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const USER_AGENT: &str = concat!("course-gen/", env!("CARGO_PKG_VERSION"));

/// Provider call failures
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// One structured generation call
#[async_trait]
pub trait GenerativeCall: Send + Sync {
    /// Returns the raw structured payload the model produced for `schema`
    async fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema: &SchemaDescriptor,
    ) -> Result<Value, ProviderError>;
}

/// Anthropic Messages API client
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl AnthropicClient {
    /// Build a client from provider settings and a resolved API key
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::InvalidApiKey);
        }

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_minute(per_minute));

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout,
            rate_limiter,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn map_send_error(&self, error: reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl GenerativeCall for AnthropicClient {
    async fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema: &SchemaDescriptor,
    ) -> Result<Value, ProviderError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/v1/messages", self.base_url);
        let body = build_request_body(&self.model, self.max_tokens, system_prompt, user_prompt, schema);

        tracing::debug!(
            model = %self.model,
            tool = schema.name,
            prompt_chars = user_prompt.len(),
            "Sending generation request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), tool = schema.name, "Generation request rejected");
            return Err(classify_status(status, error_text));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let input = extract_tool_input(&payload, schema.name)?;
        tracing::debug!(tool = schema.name, "Generation response received");
        Ok(input)
    }
}

/// Messages API request forcing one call to the schema's tool
fn build_request_body(
    model: &str,
    max_tokens: u32,
    system_prompt: &str,
    user_prompt: &str,
    schema: &SchemaDescriptor,
) -> Value {
    json!({
        "model": model,
        "max_tokens": max_tokens,
        "system": system_prompt,
        "messages": [
            { "role": "user", "content": user_prompt }
        ],
        "tools": [{
            "name": schema.name,
            "description": schema.description,
            "input_schema": schema.to_json_schema(),
        }],
        "tool_choice": { "type": "tool", "name": schema.name },
    })
}

fn classify_status(status: StatusCode, body: String) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::InvalidApiKey,
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
        _ => ProviderError::Api(status.as_u16(), body),
    }
}

/// Input object of the first `tool_use` block naming `tool_name`
fn extract_tool_input(payload: &Value, tool_name: &str) -> Result<Value, ProviderError> {
    let blocks = payload
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::MalformedResponse("missing content blocks".to_string()))?;

    let input = blocks
        .iter()
        .find(|block| {
            block.get("type").and_then(Value::as_str) == Some("tool_use")
                && block.get("name").and_then(Value::as_str) == Some(tool_name)
        })
        .and_then(|block| block.get("input"))
        .ok_or_else(|| {
            ProviderError::MalformedResponse(format!("no tool_use block for `{}`", tool_name))
        })?;

    if !input.is_object() {
        return Err(ProviderError::MalformedResponse(
            "tool input is not an object".to_string(),
        ));
    }

    Ok(input.clone())
}
