//! HTTP client for webhook delivery with a bounded response timeout.
//!
//! Handles request construction, response processing, and error
//! categorization. Every attempt resolves to a [`DeliveryOutcome`]; transport
//! failures never escape as `Err` so the scheduler can treat them uniformly.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use courier_core::Notification;
use reqwest::Response;
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};

use crate::error::{DeliveryError, ErrorCategory, Result};

const MAX_ERROR_BODY_SIZE: usize = 1024;

/// Configuration for the webhook delivery client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Upper bound on a single attempt, connect to last body byte.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Maximum number of redirects to follow.
    pub max_redirects: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: crate::DEFAULT_RESPONSE_TIMEOUT,
            user_agent: "Courier-Webhook-Delivery/1.0".to_string(),
            max_redirects: 3,
        }
    }
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The destination answered with a 2xx status.
    Delivered {
        /// HTTP status code returned
        status_code: u16,
    },
    /// The attempt failed and should be backed off.
    Failed {
        /// Categorized cause of the failure
        reason: DeliveryError,
    },
}

impl DeliveryOutcome {
    /// Whether the attempt succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// HTTP status of the response, if one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Delivered { status_code } => Some(*status_code),
            Self::Failed { reason } => reason.status_code(),
        }
    }

    /// Failure cause, if the attempt failed.
    pub fn error(&self) -> Option<&DeliveryError> {
        match self {
            Self::Delivered { .. } => None,
            Self::Failed { reason } => Some(reason),
        }
    }
}

impl From<Result<u16>> for DeliveryOutcome {
    fn from(result: Result<u16>) -> Self {
        match result {
            Ok(status_code) => Self::Delivered { status_code },
            Err(reason) => Self::Failed { reason },
        }
    }
}

/// Sends a single notification to its destination.
///
/// Implementations must not touch scheduler state and must report every
/// failure through [`DeliveryOutcome::Failed`] rather than panicking.
#[async_trait]
pub trait Deliver: Send + Sync + std::fmt::Debug {
    /// Performs one delivery attempt.
    async fn send(&self, notification: &Notification) -> DeliveryOutcome;
}

/// HTTP client that posts notification payloads as JSON.
///
/// Uses connection pooling across attempts. The configured timeout bounds
/// each attempt as a whole.
#[derive(Debug, Clone)]
pub struct HttpDeliveryClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpDeliveryClient {
    /// Creates a new delivery client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the HTTP client cannot
    /// be configured with the provided settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects as usize))
            .build()
            .map_err(|e| {
                DeliveryError::configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    /// Creates a new delivery client with default configuration.
    ///
    /// # Errors
    ///
    /// See [`HttpDeliveryClient::new`].
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Posts the notification payload and classifies the response.
    ///
    /// # Errors
    ///
    /// - `Timeout` when the attempt exceeds the configured timeout
    /// - `NetworkError` for connection and other transport failures
    /// - `RateLimited` for 429 responses
    /// - `ClientError` for other 4xx responses
    /// - `ServerError` for 5xx responses
    /// - `UnexpectedStatus` for anything else outside 2xx
    pub async fn deliver(&self, notification: &Notification) -> Result<u16> {
        let start_time = Instant::now();

        let span = info_span!(
            "webhook_delivery",
            sequence_id = %notification.sequence_id,
            destination = %notification.destination,
        );

        async move {
            tracing::debug!("starting webhook delivery");

            let response = match self
                .client
                .post(notification.destination.as_url().clone())
                .json(&notification.payload())
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    let error = self.classify_transport_error(&e);
                    tracing::debug!(
                        duration_ms = start_time.elapsed().as_millis(),
                        category = %ErrorCategory::from(&error),
                        "request failed: {e}"
                    );
                    return Err(error);
                },
            };

            let status_code = response.status().as_u16();
            tracing::debug!(
                status = status_code,
                duration_ms = start_time.elapsed().as_millis(),
                "received response"
            );

            if response.status().is_success() {
                return Ok(status_code);
            }

            let body = read_error_body(response).await;
            Err(DeliveryError::from_status(status_code, body))
        }
        .instrument(span)
        .await
    }

    fn classify_transport_error(&self, error: &reqwest::Error) -> DeliveryError {
        if error.is_timeout() {
            let timeout_ms = u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX);
            return DeliveryError::timeout(timeout_ms);
        }
        if error.is_connect() {
            return DeliveryError::network(format!("connection failed: {error}"));
        }
        DeliveryError::network(error.to_string())
    }
}

#[async_trait]
impl Deliver for HttpDeliveryClient {
    async fn send(&self, notification: &Notification) -> DeliveryOutcome {
        self.deliver(notification).await.into()
    }
}

/// Reads at most `MAX_ERROR_BODY_SIZE` bytes of a failed response body.
async fn read_error_body(response: Response) -> String {
    match response.bytes().await {
        Ok(bytes) if bytes.len() > MAX_ERROR_BODY_SIZE => {
            let truncated = String::from_utf8_lossy(&bytes[..MAX_ERROR_BODY_SIZE]);
            format!("{truncated}... (truncated)")
        },
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::debug!("failed to read response body: {e}");
            format!("[failed to read response body: {e}]")
        },
    }
}
