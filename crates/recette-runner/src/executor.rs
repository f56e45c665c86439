//! Request executor: one fixture case → one HTTP GET
//!
//! Exactly one network call per case, no retries. The exchange (url, status,
//! elapsed, truncated body) is captured whatever the result, so dumps and
//! reports can show what the service answered.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::debug;

use recette_core::fixture::TestCase;
use recette_core::projector::service_error;
use recette_core::{Config, Exchange};

/// Stored response bodies are cut at this many bytes.
const MAX_BODY_BYTES: usize = 4096;

/// Longest body excerpt used as a client error message.
const MAX_MESSAGE_CHARS: usize = 200;

/// Result of sending one case.
#[derive(Debug)]
pub struct Execution {
    pub exchange: Exchange,
    /// Parsed JSON body of a 2xx response, or why there is none
    pub result: Result<Value, ExecError>,
}

/// Sends fixture cases against one base URL.
#[derive(Debug)]
pub struct Executor {
    client: reqwest::blocking::Client,
    base_url: String,
    timeout_secs: u64,
}

impl Executor {
    /// Build the shared client: per-request timeout plus configured headers.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if a header is invalid or the client fails to build.
    pub fn new(base_url: &str, config: &Config) -> Result<Self, RunnerError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| RunnerError::Header(key.clone(), e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| RunnerError::Header(key.clone(), e.to_string()))?;
            headers.insert(name, value);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| RunnerError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `<base_url><route><request>`.
    #[must_use]
    pub fn execute(&self, case: &TestCase) -> Execution {
        let url = case.url(&self.base_url);
        let start = Instant::now();
        let sent = self.client.get(&url).send();
        let mut exchange = Exchange {
            url,
            status_code: None,
            elapsed_ms: 0,
            body: None,
        };

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                exchange.elapsed_ms = elapsed_ms(start);
                let message = if e.is_timeout() {
                    format!("request timed out after {}s", self.timeout_secs)
                } else {
                    e.to_string()
                };
                debug!(url = %exchange.url, error = %message, "transport failure");
                return Execution {
                    exchange,
                    result: Err(ExecError::Transport(message)),
                };
            }
        };

        let status = response.status();
        let text = response.text();
        exchange.elapsed_ms = elapsed_ms(start);
        exchange.status_code = Some(status.as_u16());

        let text = match text {
            Ok(text) => text,
            Err(e) => {
                return Execution {
                    exchange,
                    result: Err(ExecError::Transport(format!("reading body: {e}"))),
                };
            }
        };
        exchange.body = truncate_body(&text);

        debug!(
            url = %exchange.url,
            status = status.as_u16(),
            elapsed_ms = exchange.elapsed_ms,
            "response received"
        );

        let result = if status.is_success() {
            serde_json::from_str(&text).map_err(|e| ExecError::Decode {
                status: status.as_u16(),
                message: e.to_string(),
            })
        } else {
            Err(ExecError::Client {
                status: status.as_u16(),
                message: client_message(&text, status.canonical_reason()),
            })
        };

        Execution { exchange, result }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Truncate on a char boundary, keeping the total size in the marker.
fn truncate_body(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else if text.len() <= MAX_BODY_BYTES {
        Some(text.to_string())
    } else {
        let mut end = MAX_BODY_BYTES;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        Some(format!("{}…({} bytes total)", &text[..end], text.len()))
    }
}

/// Best message for a non-2xx response: the service's `error`, then the raw
/// body, then the canonical reason phrase.
fn client_message(text: &str, reason: Option<&str>) -> String {
    if let Some(message) = serde_json::from_str::<Value>(text)
        .ok()
        .as_ref()
        .and_then(service_error)
    {
        return message;
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return reason.unwrap_or("no reason").to_string();
    }
    trimmed.chars().take(MAX_MESSAGE_CHARS).collect()
}

/// Why a sent case produced no usable body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    /// Non-2xx response
    #[error("HTTP {status}: {message}")]
    Client { status: u16, message: String },
    /// Connection failure, timeout, or truncated read
    #[error("transport error: {0}")]
    Transport(String),
    /// 2xx response whose body is not JSON
    #[error("HTTP {status} with invalid JSON body: {message}")]
    Decode { status: u16, message: String },
}

/// Failures that stop the run before any case is sent.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("invalid header '{0}': {1}")]
    Header(String, String),
    #[error("HTTP client error: {0}")]
    Client(String),
}
