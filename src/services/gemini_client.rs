//! Client for the remote extraction model (Gemini generateContent API).
//!
//! One call = one bounded-retry state machine. Each attempt is classified
//! into exactly one of: success, transient (overload or transport trouble,
//! exponential backoff), rate-limited (linear backoff), or fatal (the
//! service rejected the payload; never retried).

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};

const TEMPERATURE: f64 = 0.1;
const MAX_OUTPUT_TOKENS: u32 = 2048;

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

impl GenerateRequest {
    fn new(instruction: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: instruction.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// How a single attempt against the remote service ended.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AttemptOutcome {
    Success(String),
    Transient(String),
    RateLimited(String),
    Fatal(String),
}

impl AttemptOutcome {
    fn reason(&self) -> &str {
        match self {
            AttemptOutcome::Success(_) => "success",
            AttemptOutcome::Transient(reason)
            | AttemptOutcome::RateLimited(reason)
            | AttemptOutcome::Fatal(reason) => reason,
        }
    }
}

/// Backoff before the next attempt: `2^i` seconds for transient failures,
/// `5*(i+1)` seconds when the service says it is rate limited.
fn retry_delay(outcome: &AttemptOutcome, attempt: u32) -> Duration {
    match outcome {
        AttemptOutcome::RateLimited(_) => Duration::from_secs(5 * (u64::from(attempt) + 1)),
        _ => Duration::from_secs(2u64.pow(attempt)),
    }
}

/// Drive the retry state machine over up to `max_retries` attempts.
///
/// Success and fatal outcomes terminate immediately; transient and
/// rate-limited outcomes sleep their class's backoff and advance, except
/// on the last attempt. Exhausting every attempt always ends in
/// [`AppError::ServiceUnavailable`], whatever mix of transient classes
/// caused the failures.
pub(crate) async fn call_with_retry<F, Fut>(max_retries: u32, mut send: F) -> AppResult<String>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AttemptOutcome>,
{
    for attempt in 0..max_retries {
        match send(attempt).await {
            AttemptOutcome::Success(text) => return Ok(text),
            AttemptOutcome::Fatal(detail) => {
                error!(
                    attempt = attempt + 1,
                    "Extraction service rejected the request: {}", detail
                );
                return Err(AppError::invalid_request(detail));
            }
            outcome => {
                if attempt + 1 < max_retries {
                    let delay = retry_delay(&outcome, attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries,
                        delay_secs = delay.as_secs(),
                        "Extraction service attempt failed ({}), backing off",
                        outcome.reason()
                    );
                    tokio::time::sleep(delay).await;
                } else {
                    warn!(
                        attempt = attempt + 1,
                        max_retries,
                        "Extraction service attempt failed ({}), retries exhausted",
                        outcome.reason()
                    );
                }
            }
        }
    }

    Err(AppError::service_unavailable("extraction service"))
}

/// Classify a non-2xx response status into its retry class.
fn classify_failure(status: StatusCode, body: String) -> AttemptOutcome {
    match status {
        StatusCode::SERVICE_UNAVAILABLE => {
            AttemptOutcome::Transient(format!("service unavailable (503): {}", body))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            AttemptOutcome::RateLimited(format!("rate limited (429): {}", body))
        }
        StatusCode::BAD_REQUEST => AttemptOutcome::Fatal(body),
        _ => AttemptOutcome::Transient(format!("unexpected status {}: {}", status, body)),
    }
}

/// Client for the remote extraction service.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_retries: u32,
}

impl GeminiClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.gemini_timeout_seconds))
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.gemini_url.clone(),
            api_key: config.gemini_api_key.clone(),
            max_retries: config.gemini_max_retries,
        })
    }

    /// Send the instruction and return the model's response text, retrying
    /// transient failures with per-class backoff.
    pub async fn generate(&self, instruction: &str) -> AppResult<String> {
        let payload = GenerateRequest::new(instruction);

        call_with_retry(self.max_retries, |attempt| {
            info!(
                attempt = attempt + 1,
                max_retries = self.max_retries,
                "Calling extraction service"
            );
            self.send_once(&payload)
        })
        .await
    }

    async fn send_once(&self, payload: &GenerateRequest) -> AttemptOutcome {
        let result = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(payload)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return AttemptOutcome::Transient(format!("request timed out: {}", e));
            }
            Err(e) if e.is_connect() => {
                return AttemptOutcome::Transient(format!("connection failed: {}", e));
            }
            Err(e) => return AttemptOutcome::Transient(format!("transport error: {}", e)),
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<GenerateResponse>().await {
                Ok(body) => match body.into_text() {
                    Some(text) => AttemptOutcome::Success(text),
                    None => AttemptOutcome::Fatal(
                        "response contained no candidate text".to_string(),
                    ),
                },
                Err(e) => AttemptOutcome::Fatal(format!("undecodable response body: {}", e)),
            };
        }

        let body = response.text().await.unwrap_or_default();
        classify_failure(status, body)
    }
}
