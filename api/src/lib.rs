//! HTTP surface: chat, recommendation, embedding and health endpoints.

pub mod app;
pub mod error_handler;
pub mod middleware_layer;
pub mod routes;

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderName, Method},
    middleware,
    routing::{get, post},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

pub use crate::app::app_state::{ApiSettings, AppState};
pub use crate::error_handler::{AppError, AppResult};

use crate::{
    middleware_layer::request_id::{REQUEST_ID_HEADER, request_id},
    routes::{
        ask::ask_route::ask, embedding::embedding_route::embedding, health::health_route::health,
        recommend::recommend_route::recommend,
    },
};

/// Builds the application router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)]);

    Router::new()
        .route("/api/recommend", post(recommend))
        .route("/api/embedding", post(embedding))
        .route("/api/{message}", get(ask))
        .route("/health", get(health))
        .layer(cors)
        .layer(middleware::from_fn(request_id))
        .with_state(state)
}

/// Loads state from the environment and serves until Ctrl+C.
///
/// # Errors
/// Configuration errors, bind failures and fatal server errors.
pub async fn start() -> AppResult<()> {
    let settings = ApiSettings::from_env();
    let state = AppState::from_env().map_err(AppError::Config)?;

    let listener = TcpListener::bind(&settings.address)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %settings.address, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("server stopped");
    Ok(())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        // Without a signal handler keep serving until the process is killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use ai_llm_service::{
        AiLlmError, CompletionResult, EmbeddingGateway, EmbeddingVector, LlmProvider,
        ModelGateway, Turn,
    };
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, Response, StatusCode, header},
    };
    use chat_context::{ChatContext, ContextOptions};
    use chat_memory::ConversationStore;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    #[derive(Clone, Copy)]
    enum Mode {
        Echo,
        Fail,
        Empty,
        Hang,
    }

    struct MockGateway {
        mode: Mode,
        calls: AtomicUsize,
        seen: Mutex<Vec<Vec<Turn>>>,
    }

    #[async_trait]
    impl ModelGateway for MockGateway {
        fn model(&self) -> &str {
            "mock"
        }

        async fn chat(&self, messages: &[Turn]) -> ai_llm_service::Result<CompletionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(messages.to_vec());
            match self.mode {
                Mode::Echo => Ok(CompletionResult {
                    text: format!("re: {}", messages.last().unwrap().text()),
                    model: "mock".into(),
                }),
                Mode::Fail => Err(AiLlmError::unavailable(LlmProvider::OpenAI, "HTTP 503")),
                Mode::Empty => Err(AiLlmError::EmptyResponse {
                    provider: LlmProvider::Ollama,
                }),
                Mode::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!()
                }
            }
        }
    }

    #[async_trait]
    impl EmbeddingGateway for MockGateway {
        fn model(&self) -> &str {
            "mock-embed"
        }

        async fn embeddings(&self, input: &str) -> ai_llm_service::Result<EmbeddingVector> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(input.bytes().map(f32::from).collect())
        }
    }

    fn app_with(mode: Mode, memory_enabled: bool) -> (Router, Arc<MockGateway>, Arc<AppState>) {
        let gw = Arc::new(MockGateway {
            mode,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        });
        let context = ChatContext::new(
            gw.clone(),
            gw.clone(),
            Arc::new(ConversationStore::new()),
            ContextOptions {
                window: 4,
                call_timeout: Duration::from_secs(2),
                system_prompt: None,
            },
        );
        let state = Arc::new(AppState::new(context, None, memory_enabled));
        (router(Arc::clone(&state)), gw, state)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(res: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(res: Response<Body>) -> Value {
        serde_json::from_str(&body_text(res).await).unwrap()
    }

    #[tokio::test]
    async fn ask_returns_plain_text_with_request_id() {
        let (app, _, _) = app_with(Mode::Echo, false);

        let res = app.oneshot(get("/api/hello%20world")).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key(REQUEST_ID_HEADER));
        let ct = res.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(ct.starts_with("text/plain"));
        assert_eq!(body_text(res).await, "re: hello world");
    }

    #[tokio::test]
    async fn incoming_request_id_is_echoed() {
        let (app, _, _) = app_with(Mode::Echo, false);
        let req = Request::builder()
            .uri("/api/hi")
            .header("X-Request-Id", "abc-123")
            .body(Body::empty())
            .unwrap();

        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.headers()[REQUEST_ID_HEADER], "abc-123");
    }

    #[tokio::test]
    async fn memory_follows_conversation_header() {
        let (app, gw, state) = app_with(Mode::Echo, true);

        for msg in ["first", "second"] {
            let req = Request::builder()
                .uri(format!("/api/{msg}"))
                .header("X-Conversation-Id", "alice")
                .body(Body::empty())
                .unwrap();
            let res = app.clone().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
        app.oneshot(get("/api/other")).await.unwrap();

        let seen = gw.seen.lock().unwrap();
        assert_eq!(
            seen[1],
            vec![
                Turn::user("first"),
                Turn::assistant("re: first"),
                Turn::user("second")
            ]
        );
        // The header-less call went to the default conversation.
        assert_eq!(seen[2], vec![Turn::user("other")]);
        drop(seen);

        let memory = state.context.memory();
        assert_eq!(memory.get("alice").await.unwrap().len().await, 4);
        assert_eq!(memory.get("default").await.unwrap().len().await, 2);
    }

    #[tokio::test]
    async fn memory_disabled_stores_nothing() {
        let (app, _, state) = app_with(Mode::Echo, false);
        app.oneshot(get("/api/hi")).await.unwrap();
        assert!(state.context.memory().is_empty().await);
    }

    #[tokio::test]
    async fn blank_message_is_bad_request_without_backend_call() {
        let (app, gw, _) = app_with(Mode::Echo, true);

        let res = app.oneshot(get("/api/%20%20")).await.unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["error"], "INVALID_INPUT");
        assert_eq!(gw.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn backend_failures_map_to_502() {
        let (app, _, state) = app_with(Mode::Fail, true);
        let res = app.oneshot(get("/api/hi")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(res).await["error"], "BACKEND_UNAVAILABLE");
        assert!(state.context.memory().get("default").await.unwrap().is_empty().await);

        let (app, _, _) = app_with(Mode::Empty, false);
        let res = app.oneshot(get("/api/hi")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(res).await["error"], "EMPTY_RESPONSE");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_maps_to_504() {
        let (app, _, _) = app_with(Mode::Hang, false);
        let res = app.oneshot(get("/api/hi")).await.unwrap();
        assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body_json(res).await["error"], "BACKEND_TIMEOUT");
    }

    #[tokio::test]
    async fn recommend_fills_template() {
        let (app, gw, _) = app_with(Mode::Echo, true);

        let res = app
            .oneshot(post("/api/recommend?type=comedy&year=2020&lang=English"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let text = body_text(res).await;
        for v in ["comedy", "2020", "English"] {
            assert!(text.contains(v), "{text}");
        }
        // Recommendations never touch memory.
        assert_eq!(gw.seen.lock().unwrap()[0].len(), 1);
    }

    #[tokio::test]
    async fn recommend_without_lang_is_bad_request() {
        let (app, gw, _) = app_with(Mode::Echo, false);

        let res = app
            .oneshot(post("/api/recommend?type=comedy&year=2020"))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["error"], "BAD_REQUEST");
        assert_eq!(gw.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn embedding_returns_json_array() {
        let (app, _, _) = app_with(Mode::Echo, false);

        let res = app.oneshot(post("/api/embedding?text=abc")).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let v = body_json(res).await;
        assert_eq!(v, serde_json::json!([97.0, 98.0, 99.0]));
    }

    #[tokio::test]
    async fn empty_embedding_text_is_bad_request() {
        let (app, _, _) = app_with(Mode::Echo, false);
        let res = app.oneshot(post("/api/embedding?text=")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_reports_memory() {
        let (app, _, _) = app_with(Mode::Echo, true);
        app.clone().oneshot(get("/api/hi")).await.unwrap();

        let res = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let v = body_json(res).await;
        assert_eq!(v["status"], "ok");
        assert_eq!(v["conversations"], 1);
        assert_eq!(v["backends"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn cors_preflight_allows_any_origin() {
        let (app, _, _) = app_with(Mode::Echo, false);
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/recommend")
            .header(header::ORIGIN, "http://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(res.headers().contains_key(REQUEST_ID_HEADER));
    }
}
