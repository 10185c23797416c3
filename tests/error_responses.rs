use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::Value;

use todo_rights::{AuthzError, Capability, EntityRef};

async fn render(err: AuthzError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn errors_map_to_http_statuses() {
    let cases = [
        (AuthzError::unauthenticated("no token"), StatusCode::UNAUTHORIZED, "unauthenticated"),
        (AuthzError::inactive("pending"), StatusCode::UNAUTHORIZED, "principal_inactive"),
        (AuthzError::not_found("task:1"), StatusCode::NOT_FOUND, "not_found"),
        (AuthzError::Forbidden, StatusCode::FORBIDDEN, "forbidden"),
        (AuthzError::not_shareable("task"), StatusCode::BAD_REQUEST, "grant_target_not_shareable"),
        (AuthzError::invalid_level("none"), StatusCode::BAD_REQUEST, "invalid_level"),
        (AuthzError::invalid_input("task"), StatusCode::BAD_REQUEST, "invalid_input"),
        (AuthzError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    ];

    for (err, expected_status, expected_code) in cases {
        let (status, body) = render(err).await;
        assert_eq!(status, expected_status);
        assert_eq!(body["error"], expected_code);
    }
}

#[tokio::test]
async fn forbidden_carries_no_detail() {
    let (_, body) = render(AuthzError::Forbidden).await;
    assert_eq!(body["message"], "forbidden");
}

#[tokio::test]
async fn unparsable_requests_are_bad_requests() {
    let (status, body) = render("task:abc".parse::<EntityRef>().unwrap_err()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");

    let (status, body) = render("archive".parse::<Capability>().unwrap_err()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}
