//! Unit tests for caller identity and billing authentication

use actix_web::{test as actix_test, web};
use promptmeter::auth::{identity_from_request, verify_bearer};
use promptmeter::config::IdentityConfig;
use promptmeter::error::AppError;
use rstest::rstest;

// =============================================================================
// Caller Identity
// =============================================================================

#[test]
fn test_identity_from_default_header() {
    let req = actix_test::TestRequest::default()
        .insert_header(("x-user-id", "user_2abc"))
        .to_http_request();

    let user = identity_from_request(&req).expect("identity present");
    assert_eq!(user.as_str(), "user_2abc");
}

#[test]
fn test_missing_header_is_no_identity() {
    let req = actix_test::TestRequest::default().to_http_request();
    assert!(identity_from_request(&req).is_none());
}

#[test]
fn test_blank_header_is_no_identity() {
    let req = actix_test::TestRequest::default()
        .insert_header(("x-user-id", "  "))
        .to_http_request();

    assert!(identity_from_request(&req).is_none());
}

#[test]
fn test_identity_from_configured_header() {
    let req = actix_test::TestRequest::default()
        .app_data(web::Data::new(IdentityConfig {
            header: "x-clerk-user".to_string(),
        }))
        .insert_header(("x-clerk-user", "user_custom"))
        .insert_header(("x-user-id", "ignored"))
        .to_http_request();

    let user = identity_from_request(&req).expect("identity present");
    assert_eq!(user.as_str(), "user_custom");
}

// =============================================================================
// Billing Bearer Token
// =============================================================================

#[rstest]
#[case("Bearer s3cret")]
#[case("Bearer s3cret ")]
fn test_valid_bearer_token(#[case] header: &str) {
    assert!(verify_bearer(Some("s3cret"), Some(header)).is_ok());
}

#[rstest]
#[case(None, Some("Bearer s3cret"))]
#[case(Some("s3cret"), None)]
#[case(Some("s3cret"), Some("Basic s3cret"))]
#[case(Some("s3cret"), Some("Bearer wrong"))]
#[case(Some("s3cret"), Some("Bearer s3cret-and-more"))]
#[case(Some("s3cret"), Some("Bearer s3cre"))]
#[case(Some("s3cret"), Some("Bearer "))]
#[case(Some("s3cret"), Some("Bearer S3CRET"))]
fn test_rejected_bearer_token(#[case] secret: Option<&str>, #[case] header: Option<&str>) {
    let result = verify_bearer(secret, header);
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}
