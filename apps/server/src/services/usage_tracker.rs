//! External usage tracker.
//!
//! Features assigned to the external authority are checked and tracked
//! against the billing provider's own counter instead of the local ledger.
//! Requests are JSON POSTs signed with HMAC-SHA256 over `timestamp.body`.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::UsageTrackerConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Feature, UserId};

type HmacSha256 = Hmac<Sha256>;

/// Counter kept by the external billing provider
#[async_trait]
pub trait UsageTracker: Send + Sync {
    /// Whether the user may spend `units` on `feature`
    async fn check(&self, user: &UserId, feature: Feature, units: i32) -> AppResult<bool>;

    /// Records `units` of completed work
    async fn track(&self, user: &UserId, feature: Feature, units: i32) -> AppResult<()>;
}

#[derive(Debug, Serialize)]
struct UsagePayload<'a> {
    user_id: &'a str,
    feature: Feature,
    units: i32,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    allowed: bool,
}

/// HTTP implementation of [`UsageTracker`]
pub struct HttpUsageTracker {
    client: reqwest::Client,
    base_url: String,
    secret: Option<String>,
}

impl HttpUsageTracker {
    /// Creates a tracker for the configured endpoint
    pub fn new(config: &UsageTrackerConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            secret: config.secret.clone(),
        })
    }

    /// Generates HMAC-SHA256 signature for a request body
    pub fn generate_signature(secret: &str, timestamp: &str, payload: &[u8]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    async fn post(&self, path: &str, payload: &UsagePayload<'_>) -> AppResult<reqwest::Response> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| AppError::Internal(format!("Failed to serialize payload: {}", e)))?;
        let timestamp = Utc::now().timestamp().to_string();

        let mut request = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .header("Content-Type", "application/json")
            .header("X-Promptmeter-Timestamp", &timestamp);

        if let Some(ref secret) = self.secret {
            let signature = Self::generate_signature(secret, &timestamp, &body);
            request = request.header("X-Promptmeter-Signature", format!("sha256={}", signature));
        }

        let response = request.body(body).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::UsageTracker("Request timed out".to_string())
            } else if e.is_connect() {
                AppError::UsageTracker("Connection failed".to_string())
            } else {
                AppError::UsageTracker(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AppError::UsageTracker(if error_body.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                format!("HTTP {}: {}", status.as_u16(), error_body)
            }));
        }

        Ok(response)
    }
}

#[async_trait]
impl UsageTracker for HttpUsageTracker {
    async fn check(&self, user: &UserId, feature: Feature, units: i32) -> AppResult<bool> {
        let payload = UsagePayload {
            user_id: user.as_str(),
            feature,
            units,
        };

        let response: CheckResponse = self
            .post("check", &payload)
            .await?
            .json()
            .await
            .map_err(|e| AppError::UsageTracker(format!("Invalid check response: {}", e)))?;

        Ok(response.allowed)
    }

    async fn track(&self, user: &UserId, feature: Feature, units: i32) -> AppResult<()> {
        let payload = UsagePayload {
            user_id: user.as_str(),
            feature,
            units,
        };

        self.post("track", &payload).await?;
        log::info!("Tracked {} unit(s) of {} for user {}", units, feature, user);
        Ok(())
    }
}
