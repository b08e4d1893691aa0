//! Backend gateway: the only component that talks to the network.
//!
//! One `send` is one HTTP POST. There is no retry and no streaming; the call
//! either yields a complete reply within `request_timeout` or fails.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GatewayConfig;
use crate::models::RawCitation;

/// Cap on how much of an error body ends up in an error message
const ERROR_BODY_PREVIEW: usize = 200;

// ============================================================================
// Gateway trait
// ============================================================================

/// Backend answer before citation normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayReply {
    pub answer: String,
    pub citations: Option<Vec<RawCitation>>,
}

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn send(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<GatewayReply, GatewayError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Backend did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Backend protocol error: {0}")]
    Protocol(String),

    #[error("Invalid gateway configuration: {0}")]
    Config(String),
}

impl GatewayError {
    fn from_transport(err: reqwest::Error, bound: Duration) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(bound)
        } else {
            GatewayError::Protocol(format!("transport failure: {}", err))
        }
    }
}

// ============================================================================
// Wire structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    user_id: &'a str,
    session_id: &'a str,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    final_answer: Option<String>,
    #[serde(default)]
    citations: Option<Vec<RawCitation>>,
}

/// Decode a response body. Missing `final_answer`/`citations` are tolerated,
/// anything that is not the expected shape is a protocol error.
pub fn decode_reply(body: &str) -> Result<GatewayReply, GatewayError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| GatewayError::Protocol(format!("malformed response body: {}", e)))?;
    // Derived Deserialize would also accept a positional array.
    if !value.is_object() {
        return Err(GatewayError::Protocol(
            "response is not a JSON object".to_string(),
        ));
    }
    let response: ChatResponse = serde_json::from_value(value)
        .map_err(|e| GatewayError::Protocol(format!("unexpected response shape: {}", e)))?;

    Ok(GatewayReply {
        answer: response.final_answer.unwrap_or_default(),
        citations: response.citations,
    })
}

// ============================================================================
// HttpGateway
// ============================================================================

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        if config.endpoint_url.trim().is_empty() {
            return Err(GatewayError::Config("endpoint_url is empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &config.api_keys {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| GatewayError::Config(format!("api key name {:?}: {}", name, e)))?;
            let mut value = HeaderValue::from_str(value)
                .map_err(|e| GatewayError::Config(format!("api key {}: {}", name, e)))?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.config.endpoint_url
    }

    async fn exchange(&self, request: &ChatRequest<'_>) -> Result<GatewayReply, GatewayError> {
        let bound = self.config.request_timeout;

        let response = self
            .client
            .post(&self.config.endpoint_url)
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::from_transport(e, bound))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::from_transport(e, bound))?;

        if !status.is_success() {
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(GatewayError::Protocol(format!(
                "backend returned {}: {}",
                status, preview
            )));
        }

        decode_reply(&body)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn send(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<GatewayReply, GatewayError> {
        let request = ChatRequest {
            user_id,
            session_id,
            message,
        };
        let started = Instant::now();
        let bound = self.config.request_timeout;

        // The client timeout guards the transfer; this one guards the whole exchange.
        let result = match tokio::time::timeout(bound, self.exchange(&request)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(bound)),
        };

        match &result {
            Ok(reply) => tracing::debug!(
                endpoint = %self.config.endpoint_url,
                elapsed_ms = started.elapsed().as_millis() as u64,
                citations = reply.citations.as_ref().map_or(0, Vec::len),
                "Backend replied"
            ),
            Err(e) => tracing::warn!(
                endpoint = %self.config.endpoint_url,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %e,
                "Backend call failed"
            ),
        }

        result
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ============================================================================
// TESTS
// ============================================================================
