//! Integration tests for the proxy router.
#![cfg(feature = "proxy")]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use edgequake_paper_digest::proxy::{router, ProxyState, ANALYZE_ROUTE};
use edgequake_paper_digest::AnalysisConfig;
use mockito::{Matcher, Server};
use serde_json::{json, Value};
use tower::ServiceExt; // for oneshot

fn app(endpoint: &str, api_key: Option<&str>) -> Router {
    let mut builder = AnalysisConfig::builder().endpoint(endpoint);
    if let Some(key) = api_key {
        builder = builder.api_key(key);
    }
    router(ProxyState::from_config(&builder.build().unwrap()).unwrap())
}

fn post(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(ANALYZE_ROUTE)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn allow_origin(response: &axum::response::Response) -> Option<&str> {
    response
        .headers()
        .get("access-control-allow-origin")
        .and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn test_preflight() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri(ANALYZE_ROUTE)
        .body(Body::empty())
        .unwrap();

    let response = app("http://127.0.0.1:9/v1", None).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(allow_origin(&response), Some("*"));
    assert_eq!(
        response.headers().get("access-control-allow-methods").unwrap(),
        "POST, OPTIONS"
    );
    assert_eq!(
        response.headers().get("access-control-allow-headers").unwrap(),
        "Content-Type"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_get_is_method_not_allowed() {
    let request = Request::builder()
        .method("GET")
        .uri(ANALYZE_ROUTE)
        .body(Body::empty())
        .unwrap();

    let response = app("http://127.0.0.1:9/v1", Some("k")).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(allow_origin(&response), Some("*"));
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_bad_body_is_bad_request() {
    for body in ["not json", r#"{"content":"x"}"#, r#"{"text":"   "}"#] {
        let response = app("http://127.0.0.1:9/v1", Some("k"))
            .oneshot(post(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }
}

#[tokio::test]
async fn test_missing_key_forwards_nothing() {
    let mut upstream = Server::new_async().await;
    let mock = upstream
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let response = app(&format!("{}/v1/chat/completions", upstream.url()), None)
        .oneshot(post(r#"{"text":"paper"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(allow_origin(&response), Some("*"));
    let body = body_json(response).await;
    assert_eq!(body["code"], "credential_missing");
    assert!(body["error"].as_str().unwrap().contains("API_KEY"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_success_passes_body_through() {
    let mut upstream = Server::new_async().await;
    let upstream_body = r#"{"choices":[{"message":{"content":"{}","reasoning_content":"hm"}}],"usage":{"total_tokens":7}}"#;
    let mock = upstream
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-server")
        .match_body(Matcher::PartialJson(json!({
            "model": "deepseek-r1",
            "response_format": { "type": "json_object" }
        })))
        .with_status(200)
        .with_body(upstream_body)
        .expect(1)
        .create_async()
        .await;

    let response = app(
        &format!("{}/v1/chat/completions", upstream.url()),
        Some("sk-server"),
    )
    .oneshot(post(r#"{"text":"paper"}"#))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(allow_origin(&response), Some("*"));
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], upstream_body.as_bytes());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_upstream_error_keeps_status_and_details() {
    let mut upstream = Server::new_async().await;
    upstream
        .mock("POST", "/v1/chat/completions")
        .with_status(429)
        .with_body(r#"{"error":{"message":"rate limited"}}"#)
        .create_async()
        .await;

    let response = app(&format!("{}/v1/chat/completions", upstream.url()), Some("k"))
        .oneshot(post(r#"{"text":"paper"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(allow_origin(&response), Some("*"));
    let body = body_json(response).await;
    assert_eq!(body["error"], "Upstream API error: 429");
    assert_eq!(body["details"]["error"]["message"], "rate limited");
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let response = app("http://127.0.0.1:9/v1/chat/completions", Some("k"))
        .oneshot(post(r#"{"text":"paper"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(allow_origin(&response), Some("*"));
}
