use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::domain::UtcDateTime;
use crate::http::{HttpAuth, HttpClient, HttpRequest};
use crate::pacing::RequestPacer;
use crate::plan::WorkUnit;
use crate::retry::RetryConfig;

/// Default upstream base URL.
pub const FBR_BASE_URL: &str = "https://fbrapi.com";

/// Unparsed upstream payload plus the work unit that produced it.
///
/// Owned transiently by the pipeline; only its normalized projection is ever
/// persisted.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub unit: WorkUnit,
    pub body: Value,
    pub fetched_at: UtcDateTime,
}

/// Typed fetch failure; classification drives the orchestrator's per-unit
/// handling.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Retry budget exhausted on a retryable condition (429/5xx, timeout,
    /// connection failure).
    #[error("transient upstream failure for {unit} after {attempts} attempts: {message}")]
    Transient {
        unit: String,
        attempts: u32,
        message: String,
    },

    /// Upstream says this request is invalid; skip the unit, do not retry.
    #[error("upstream rejected {unit}: {message}")]
    Permanent {
        unit: String,
        status: Option<u16>,
        message: String,
    },

    /// Credential problem; fatal to the whole run.
    #[error("upstream authentication failed: {message}")]
    Auth { message: String },
}

impl FetchError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Transient { .. } => "transient",
            Self::Permanent { .. } => "permanent",
            Self::Auth { .. } => "auth",
        }
    }
}

enum StatusClass {
    Success,
    Auth,
    Permanent,
    Transient,
}

const fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        401 => StatusClass::Auth,
        429 => StatusClass::Transient,
        500..=599 => StatusClass::Transient,
        _ => StatusClass::Permanent,
    }
}

/// Rate-governed client for the FBR API.
///
/// Every network call, including retries and key generation, first acquires
/// the shared [`RequestPacer`].
#[derive(Clone)]
pub struct FbrClient {
    base_url: String,
    http: Arc<dyn HttpClient>,
    auth: HttpAuth,
    pacer: RequestPacer,
    retry: RetryConfig,
    timeout_ms: u64,
}

impl FbrClient {
    pub fn new(http: Arc<dyn HttpClient>, auth: HttpAuth, pacer: RequestPacer) -> Self {
        Self {
            base_url: String::from(FBR_BASE_URL),
            http,
            auth,
            pacer,
            retry: RetryConfig::default(),
            timeout_ms: HttpRequest::DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn pacer(&self) -> &RequestPacer {
        &self.pacer
    }

    /// One-time key generation: `POST /generate_api_key` returns a fresh key
    /// the caller should persist and pass back in via [`HttpAuth::ApiKey`].
    pub async fn generate_key(&self) -> Result<String, FetchError> {
        self.pacer.acquire().await;

        let request =
            HttpRequest::post(format!("{}/generate_api_key", self.base_url))
                .with_timeout_ms(self.timeout_ms);
        let response = self.http.execute(request).await.map_err(|error| {
            FetchError::Transient {
                unit: String::from("generate_api_key"),
                attempts: 1,
                message: error.message().to_owned(),
            }
        })?;

        if !response.is_success() {
            return Err(FetchError::Permanent {
                unit: String::from("generate_api_key"),
                status: Some(response.status),
                message: format!("key generation returned status {}", response.status),
            });
        }

        let body: Value =
            serde_json::from_str(response.body.as_str()).map_err(|error| FetchError::Permanent {
                unit: String::from("generate_api_key"),
                status: None,
                message: format!("key generation body was not valid JSON: {error}"),
            })?;
        body.get("api_key")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| FetchError::Permanent {
                unit: String::from("generate_api_key"),
                status: None,
                message: String::from("key generation response carried no api_key field"),
            })
    }

    /// Fetches one work unit, retrying transient failures with bounded
    /// backoff. Payloads that omit optional stat categories are valid here;
    /// shape enforcement belongs to normalization.
    pub async fn fetch(&self, unit: &WorkUnit) -> Result<RawPayload, FetchError> {
        let url = format!(
            "{}/{}?{}",
            self.base_url,
            unit.endpoint.path(),
            unit.query_string()
        );

        let mut attempt: u32 = 0;
        loop {
            self.pacer.acquire().await;

            let request = HttpRequest::get(url.as_str())
                .with_auth(&self.auth)
                .with_timeout_ms(self.timeout_ms);

            let transient_message = match self.http.execute(request).await {
                Ok(response) => match classify_status(response.status) {
                    StatusClass::Success => {
                        let body = serde_json::from_str(response.body.as_str()).map_err(
                            |error| FetchError::Permanent {
                                unit: unit.key(),
                                status: Some(response.status),
                                message: format!("response body was not valid JSON: {error}"),
                            },
                        )?;
                        return Ok(RawPayload {
                            unit: unit.clone(),
                            body,
                            fetched_at: UtcDateTime::now(),
                        });
                    }
                    StatusClass::Auth => {
                        return Err(FetchError::Auth {
                            message: format!(
                                "upstream returned status 401 for {}; refresh the API key",
                                unit.key()
                            ),
                        });
                    }
                    StatusClass::Permanent => {
                        return Err(FetchError::Permanent {
                            unit: unit.key(),
                            status: Some(response.status),
                            message: format!("upstream returned status {}", response.status),
                        });
                    }
                    StatusClass::Transient => {
                        format!("upstream returned status {}", response.status)
                    }
                },
                Err(error) if error.retryable() => error.message().to_owned(),
                Err(error) => {
                    return Err(FetchError::Permanent {
                        unit: unit.key(),
                        status: None,
                        message: error.message().to_owned(),
                    });
                }
            };

            if attempt >= self.retry.max_retries {
                return Err(FetchError::Transient {
                    unit: unit.key(),
                    attempts: attempt + 1,
                    message: transient_message,
                });
            }

            let delay = self.retry.delay_for_attempt(attempt);
            attempt += 1;
            tokio::time::sleep(delay).await;
        }
    }
}
