use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::config::IdentityConfig;
use crate::error::AppError;
use crate::models::UserId;

/// Caller identity forwarded by the auth gateway, if any
///
/// Absence of identity is a distinct state, not an anonymous user with zero
/// quota, so this extractor never fails.
///
/// ```ignore
/// async fn handler(caller: CallerIdentity) -> HttpResponse {
///     match caller.user() { ... }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Option<UserId>);

impl CallerIdentity {
    pub fn user(&self) -> Option<&UserId> {
        self.0.as_ref()
    }
}

/// Reads the identity header configured for this app
pub fn identity_from_request(req: &HttpRequest) -> Option<UserId> {
    let header = req
        .app_data::<web::Data<IdentityConfig>>()
        .map(|config| config.header.clone())
        .unwrap_or_else(|| IdentityConfig::default().header);

    req.headers()
        .get(header.as_str())
        .and_then(|h| h.to_str().ok())
        .and_then(UserId::new)
}

impl FromRequest for CallerIdentity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(CallerIdentity(identity_from_request(req))))
    }
}

/// Extractor that requires a caller identity
///
/// Rejects with `NotAuthenticated` (401) when the header is missing or blank.
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller(pub UserId);

impl FromRequest for AuthenticatedCaller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            identity_from_request(req)
                .map(AuthenticatedCaller)
                .ok_or(AppError::NotAuthenticated),
        )
    }
}
