//! Transport proxy: keeps the credential off untrusted clients.
//!
//! A browser or desktop client posts `{"text": ...}` to [`ANALYZE_ROUTE`];
//! the proxy builds the exact request [`ChatCompletionsClient`] would build,
//! attaches `Authorization: Bearer <API_KEY>` and relays the upstream answer.
//!
//! | Situation | Status | Body |
//! |-----------|--------|------|
//! | `OPTIONS` preflight | 204 | empty, CORS headers |
//! | any other non-POST | 405 | `{"error"}` |
//! | body is not `{"text": "<non-blank>"}` | 400 | `{"error"}` |
//! | no credential configured | 500 | `{"error", "code": "credential_missing"}` |
//! | upstream non-2xx | upstream's | `{"error": "Upstream API error: <status>", "details"}` |
//! | upstream unreachable | 502 | `{"error"}` |
//! | upstream 2xx | 200 | upstream body, verbatim |
//!
//! Every non-preflight response carries `Access-Control-Allow-Origin: *`.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::pipeline::client::{AnalysisRequest, ChatCompletionsClient, CREDENTIAL_MISSING_CODE};
use axum::{
    body::Bytes,
    extract::State,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
        },
        Method, StatusCode,
    },
    response::{IntoResponse, Json, Response},
    routing::any,
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Route served by the proxy.
pub const ANALYZE_ROUTE: &str = "/api/analyze";

/// Shared handler state: the upstream client, credential included.
#[derive(Clone)]
pub struct ProxyState {
    upstream: Arc<ChatCompletionsClient>,
}

impl ProxyState {
    /// Upstream endpoint, model, prompt and credential come from `config`.
    /// A missing credential is not an error here; requests get a 500 instead.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        Ok(Self {
            upstream: Arc::new(ChatCompletionsClient::from_config(config)?),
        })
    }
}

/// Build the proxy router.
pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route(ANALYZE_ROUTE, any(analyze))
        .with_state(state)
}

/// Bind `addr` and serve until the process exits.
pub async fn serve(addr: SocketAddr, state: ProxyState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Proxy listening on http://{}{}", listener.local_addr()?, ANALYZE_ROUTE);
    axum::serve(listener, router(state)).await
}

async fn analyze(State(state): State<ProxyState>, method: Method, body: Bytes) -> Response {
    if method == Method::OPTIONS {
        return preflight();
    }
    if method != Method::POST {
        return error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "error": "Only POST requests are supported" }),
        );
    }

    let request = match serde_json::from_slice::<AnalysisRequest>(&body) {
        Ok(request) if !request.text.trim().is_empty() => request,
        Ok(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": "Field 'text' must not be empty" }),
            )
        }
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": format!("Expected a JSON body {{\"text\": string}}: {e}") }),
            )
        }
    };

    info!("Proxying analysis request ({} chars)", request.text.chars().count());
    match state.upstream.post_completion(&request.text).await {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "application/json"), (ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
            body,
        )
            .into_response(),
        Err(e) => failure_response(e),
    }
}

fn preflight() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
        .into_response()
}

fn error_response(status: StatusCode, body: Value) -> Response {
    (status, [(ACCESS_CONTROL_ALLOW_ORIGIN, "*")], Json(body)).into_response()
}

fn failure_response(error: AnalysisError) -> Response {
    warn!("Proxy request failed: {}", error);
    match error {
        AnalysisError::CredentialMissing { .. } => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "error": "API_KEY is not configured on the proxy",
                "code": CREDENTIAL_MISSING_CODE,
            }),
        ),
        AnalysisError::UpstreamHttp { status, body } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            error_response(
                status,
                json!({
                    "error": format!("Upstream API error: {}", status.as_u16()),
                    "details": upstream_details(&body),
                }),
            )
        }
        AnalysisError::NetworkFailure { endpoint, detail } => error_response(
            StatusCode::BAD_GATEWAY,
            json!({ "error": format!("Upstream API unreachable ({endpoint}): {detail}") }),
        ),
        other => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": other.to_string() }),
        ),
    }
}

/// Upstream error body as JSON when it parses, else as a string.
fn upstream_details(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_keep_json_structure() {
        assert_eq!(
            upstream_details(r#"{"error":{"message":"bad key"}}"#),
            json!({ "error": { "message": "bad key" } })
        );
    }

    #[test]
    fn details_fall_back_to_text() {
        assert_eq!(
            upstream_details("<html>Bad Gateway</html>"),
            json!("<html>Bad Gateway</html>")
        );
    }

    #[test]
    fn credential_missing_carries_code() {
        let response = failure_response(AnalysisError::CredentialMissing { hint: String::new() });
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[test]
    fn network_failure_is_bad_gateway() {
        let response = failure_response(AnalysisError::NetworkFailure {
            endpoint: "https://api.example".into(),
            detail: "connection refused".into(),
        });
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
