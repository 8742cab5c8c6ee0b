use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use sha2::{Digest, Sha256};
use std::future::{ready, Ready};
use subtle::ConstantTimeEq;

use crate::config::BillingConfig;
use crate::error::AppError;

/// Extractor for the billing provider's internal calls
///
/// Expects `Authorization: Bearer <BILLING_WEBHOOK_SECRET>`. Every request is
/// rejected when no secret is configured.
pub struct BillingAuth;

impl FromRequest for BillingAuth {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let secret = req
            .app_data::<web::Data<BillingConfig>>()
            .and_then(|config| config.webhook_secret.clone());

        let auth_header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        ready(verify_bearer(secret.as_deref(), auth_header).map(|_| BillingAuth))
    }
}

/// Checks a raw Authorization header against the configured secret
pub fn verify_bearer(secret: Option<&str>, header: Option<&str>) -> Result<(), AppError> {
    let secret = secret.ok_or_else(|| {
        AppError::Unauthorized("Billing webhook secret is not configured".to_string())
    })?;

    let header = header
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized(
            "Invalid Authorization header format, expected 'Bearer <token>'".to_string(),
        )
    })?;

    // Digests have a fixed length, so the comparison time does not depend on
    // how long the presented token is
    let presented = Sha256::digest(token.trim().as_bytes());
    let expected = Sha256::digest(secret.as_bytes());

    if !bool::from(presented.as_slice().ct_eq(expected.as_slice())) {
        return Err(AppError::Unauthorized("Invalid billing token".to_string()));
    }

    Ok(())
}
