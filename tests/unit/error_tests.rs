// ==============================
// tests/unit/error_tests.rs
// ==============================
//! Error taxonomy: HTTP mapping and message sanitization.
use axum::http::StatusCode;
use axum::response::IntoResponse;
use backend_lib::error::AppError;

#[test]
fn each_error_class_maps_to_its_status() {
    let cases = [
        (AppError::Network("down".to_string()), StatusCode::BAD_GATEWAY),
        (
            AppError::Authorization("expired".to_string()),
            StatusCode::UNAUTHORIZED,
        ),
        (
            AppError::Schema("bad shape".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
        (
            AppError::Conflict("duplicate".to_string()),
            StatusCode::CONFLICT,
        ),
        (AppError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
        (
            AppError::Auth("bad password".to_string()),
            StatusCode::UNAUTHORIZED,
        ),
        (
            AppError::NotFound("nope".to_string()),
            StatusCode::NOT_FOUND,
        ),
        (
            AppError::InvalidInput("bad".to_string()),
            StatusCode::BAD_REQUEST,
        ),
    ];

    for (error, status) in cases {
        assert_eq!(error.status_code(), status, "wrong status for {error}");
    }
}

#[test]
fn responses_are_json() {
    let response = AppError::RateLimited.into_response();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.contains("application/json"));
}

#[test]
fn the_generic_messages_match_the_ui_contract() {
    assert_eq!(
        AppError::Auth("detail".to_string()).sanitized_message(),
        "Invalid email or password"
    );
    assert_eq!(
        AppError::RateLimited.sanitized_message(),
        "Too many attempts, please try again later"
    );
}
