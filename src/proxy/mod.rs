//! HTTP proxy endpoints between the panel UI and the completion gateway
//!
//! Two POST endpoints reshape domain intents into gateway calls. The panel
//! runs on a different origin than the proxy, so every route sits behind a
//! permissive CORS layer that also answers OPTIONS pre-flights. A missing
//! gateway credential fails each request up front, before any network call.

pub mod research;

use crate::config::Config;
use crate::gateway::{ChatMessage, CompletionGateway, CompletionRequest, HttpGateway};
use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use research::Finding;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state
pub struct AppState {
    /// `None` when the gateway credential is not configured
    gateway: Option<Arc<dyn CompletionGateway>>,
    max_tokens: usize,
}

impl AppState {
    pub fn new(gateway: Option<Arc<dyn CompletionGateway>>, max_tokens: usize) -> Self {
        Self {
            gateway,
            max_tokens,
        }
    }
}

/// Request for `/chat`: the panel's conversation, forwarded verbatim
#[derive(Debug, Deserialize)]
struct ChatProxyRequest {
    messages: Vec<ChatMessage>,
}

/// Response for `/chat`
#[derive(Debug, Serialize)]
struct ChatProxyResponse {
    response: String,
}

/// Request for `/research`
#[derive(Debug, Deserialize)]
struct ResearchRequest {
    query: String,
}

/// Response for `/research`
#[derive(Debug, Serialize)]
struct ResearchResponse {
    results: Vec<Finding>,
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Build the proxy router over shared state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/chat", post(handle_chat))
        .route("/research", post(handle_research))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the proxy server
pub async fn run_proxy_server(host: &str, port: u16, config: &Config) -> Result<()> {
    let gateway = match HttpGateway::from_env(&config.gateway) {
        Ok(gateway) => Some(Arc::new(gateway) as Arc<dyn CompletionGateway>),
        Err(e) => {
            // Requests will answer 500 until the credential appears in the
            // environment and the server restarts.
            tracing::error!("Gateway credential missing: {}", e);
            None
        }
    };
    let state = Arc::new(AppState::new(gateway, config.gateway.max_tokens));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Proxy server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatProxyRequest>,
) -> impl IntoResponse {
    let Some(gateway) = &state.gateway else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "error": format!("{} is not configured", crate::gateway::API_KEY_ENV)
            })),
        )
            .into_response();
    };

    match gateway.complete(CompletionRequest::new(req.messages)).await {
        Ok(response) => (StatusCode::OK, Json(ChatProxyResponse { response })).into_response(),
        Err(e) => {
            tracing::error!("Chat proxy error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn handle_research(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResearchRequest>,
) -> impl IntoResponse {
    let Some(gateway) = &state.gateway else {
        return research_failure(format!(
            "{} is not configured",
            crate::gateway::API_KEY_ENV
        ));
    };

    let request = CompletionRequest::new(research::request_messages(&req.query))
        .with_temperature(research::TEMPERATURE)
        .with_max_tokens(state.max_tokens);

    match gateway.complete(request).await {
        Ok(raw) => {
            let results = research::parse_findings(&raw);
            (StatusCode::OK, Json(ResearchResponse { results })).into_response()
        }
        Err(e) => {
            tracing::error!("Research proxy error: {}", e);
            research_failure(e.to_string())
        }
    }
}

fn research_failure(error: String) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": error, "results": [] })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Gateway stub: counts calls, records requests, replays a script
    struct StubGateway {
        calls: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
        reply: Result<String, String>,
    }

    impl StubGateway {
        fn replying(text: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                reply: Ok(text.to_string()),
            }
        }

        fn failing(error: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                reply: Err(error.to_string()),
            }
        }
    }

    #[async_trait]
    impl CompletionGateway for StubGateway {
        async fn complete(&self, request: CompletionRequest) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(GatewayError::ServiceError(e.clone())),
            }
        }
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn chat_forwards_messages_verbatim() {
        let stub = Arc::new(StubGateway::replying("hello there"));
        let state = Arc::new(AppState::new(Some(stub.clone()), 2000));

        let messages = vec![
            ChatMessage::system("You are an expert rust developer."),
            ChatMessage::user("Explain this rust code:\n\nfn main() {}"),
        ];
        let response = handle_chat(
            State(state),
            Json(ChatProxyRequest {
                messages: messages.clone(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["response"], "hello there");

        let seen = stub.requests.lock().unwrap();
        assert_eq!(seen[0].messages, messages);
        assert!(seen[0].temperature.is_none());
        assert!(seen[0].max_tokens.is_none());
    }

    #[tokio::test]
    async fn chat_surfaces_gateway_failure_as_error_payload() {
        let stub = Arc::new(StubGateway::failing("upstream down"));
        let state = Arc::new(AppState::new(Some(stub), 2000));

        let response = handle_chat(
            State(state),
            Json(ChatProxyRequest {
                messages: vec![ChatMessage::user("hi")],
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("upstream down"));
    }

    #[tokio::test]
    async fn research_shapes_non_json_reply_without_failing() {
        let stub = Arc::new(StubGateway::replying(
            "First key point about the topic.\n\nSecond key point.\n\nThird.",
        ));
        let state = Arc::new(AppState::new(Some(stub.clone()), 2000));

        let response = handle_research(
            State(state),
            Json(ResearchRequest {
                query: "anything".into(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let results = body["results"].as_array().unwrap();
        assert!(!results.is_empty() && results.len() <= research::MAX_FINDINGS);
        for result in results {
            assert!(!result["title"].as_str().unwrap().is_empty());
            assert!(!result["snippet"].as_str().unwrap().is_empty());
        }

        // Research bounds sampling; chat leaves it unset
        let seen = stub.requests.lock().unwrap();
        assert_eq!(seen[0].temperature, Some(research::TEMPERATURE));
        assert_eq!(seen[0].max_tokens, Some(2000));
    }

    #[tokio::test]
    async fn research_without_credential_makes_no_network_call() {
        let state = Arc::new(AppState::new(None, 2000));

        let response = handle_research(
            State(state),
            Json(ResearchRequest {
                query: "anything".into(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("AGNI_GATEWAY_API_KEY"));
        assert_eq!(body["results"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn chat_without_credential_makes_no_network_call() {
        let state = Arc::new(AppState::new(None, 2000));
        let response = handle_chat(
            State(state),
            Json(ChatProxyRequest {
                messages: vec![ChatMessage::user("hi")],
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn research_gateway_failure_keeps_results_empty() {
        let stub = Arc::new(StubGateway::failing("AI API error: 502"));
        let state = Arc::new(AppState::new(Some(stub), 2000));

        let response = handle_research(
            State(state),
            Json(ResearchRequest {
                query: "anything".into(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["results"].as_array().unwrap().is_empty());
        assert!(body["error"].as_str().unwrap().contains("502"));
    }
}
