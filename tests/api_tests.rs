//! Router tests against a scripted provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

use qa_chat_relay::config::{Settings, MAX_TOKENS, MODEL_NAME, TEMPERATURE};
use qa_chat_relay::error::{ProviderError, RelayError};
use qa_chat_relay::provider::{
    ChatProvider, CompletionEvent, CompletionRequest, CompletionStream, StreamChunk,
};
use qa_chat_relay::server::api::{build_router, AppState};

/// Provider that records its calls and replays a fixed script.
struct MockProvider {
    calls: Mutex<Vec<(String, CompletionRequest)>>,
    deltas: Vec<&'static str>,
    failure: Option<ProviderError>,
}

impl MockProvider {
    fn streaming(deltas: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            deltas,
            failure: None,
        })
    }

    fn failing(failure: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            deltas: vec![],
            failure: Some(failure),
        })
    }

    fn calls(&self) -> Vec<(String, CompletionRequest)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn stream_chat(
        &self,
        api_key: &str,
        request: CompletionRequest,
    ) -> Result<CompletionStream, RelayError> {
        self.calls
            .lock()
            .unwrap()
            .push((api_key.to_string(), request));

        if let Some(failure) = &self.failure {
            return Err(failure.clone().into());
        }

        let (tx, rx) = mpsc::channel(self.deltas.len() + 1);
        for delta in &self.deltas {
            tx.send(CompletionEvent::Chunk(StreamChunk::text(*delta)))
                .await
                .unwrap();
        }
        Ok(rx)
    }
}

fn router(api_key: Option<&str>, provider: Arc<MockProvider>) -> Router {
    let settings = Arc::new(Settings::new(api_key.map(str::to_string)));
    build_router(Arc::new(AppState { settings, provider }))
}

fn chat_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn test_root_and_health_payloads() {
    let app = router(None, MockProvider::streaming(vec![]));

    for _ in 0..2 {
        let response = app.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"message": "AI Q&A Chat API is running"})
        );

        let response = app.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"status": "healthy", "service": "AI Q&A Chat API"})
        );
    }
}

#[tokio::test]
async fn test_chat_streams_frames_and_sentinel() {
    let provider = MockProvider::streaming(vec!["Hi", " there"]);
    let app = router(Some("gsk_test"), provider.clone());

    let response = app
        .oneshot(chat_request(
            json!({"messages": [{"role": "user", "content": "hello"}]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert_eq!(headers[header::CONNECTION], "keep-alive");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "*");

    assert_eq!(
        body_text(response).await,
        "data: {\"content\": \"Hi\"}\n\ndata: {\"content\": \" there\"}\n\ndata: [DONE]\n\n"
    );
    assert_eq!(provider.calls().len(), 1);
}

#[tokio::test]
async fn test_request_forwarded_in_order_with_fixed_parameters() {
    let provider = MockProvider::streaming(vec![]);
    let app = router(Some("gsk_test"), provider.clone());

    let response = app
        .oneshot(chat_request(json!({"messages": [
            {"role": "system", "content": "Be brief."},
            {"role": "user", "content": "first"},
            {"role": "assistant", "content": "second"},
            {"role": "user", "content": "third"},
        ]})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "data: [DONE]\n\n");

    let calls = provider.calls();
    let (api_key, request) = &calls[0];
    assert_eq!(api_key, "gsk_test");
    assert_eq!(request.model, MODEL_NAME);
    assert_eq!(request.temperature, TEMPERATURE);
    assert_eq!(request.max_tokens, MAX_TOKENS);
    assert!(request.stream);

    let contents: Vec<&str> = request.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["Be brief.", "first", "second", "third"]);
    let roles: Vec<&str> = request.messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
}

#[tokio::test]
async fn test_empty_message_list_is_forwarded() {
    let provider = MockProvider::streaming(vec!["ok"]);
    let app = router(Some("gsk_test"), provider.clone());

    let response = app
        .oneshot(chat_request(json!({"messages": []})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        "data: {\"content\": \"ok\"}\n\ndata: [DONE]\n\n"
    );

    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].1.messages.is_empty());
}

#[tokio::test]
async fn test_missing_api_key_is_a_server_error() {
    let provider = MockProvider::streaming(vec!["never"]);
    let app = router(None, provider.clone());

    let bodies = [
        json!({"messages": []}),
        json!({"messages": [{"role": "user", "content": "hello"}]}),
        json!({"messages": [{"role": "anything", "content": ""}, {"role": "user", "content": "x"}]}),
    ];

    for body in bodies {
        let response = app.clone().oneshot(chat_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body_json(response).await["detail"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(detail.contains("not configured"), "unexpected detail: {detail}");
    }

    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_provider_auth_failure_is_json_error() {
    let provider = MockProvider::failing(ProviderError::Status {
        status: 401,
        message: "Invalid API Key".to_string(),
    });
    let app = router(Some("gsk_revoked"), provider);

    let response = app
        .oneshot(chat_request(
            json!({"messages": [{"role": "user", "content": "hello"}]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

    let text = body_text(response).await;
    assert!(!text.contains("data:"));
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        body["detail"],
        "Groq API error: Error code: 401 - Invalid API Key"
    );
}

#[tokio::test]
async fn test_malformed_body_rejected_before_provider() {
    let provider = MockProvider::streaming(vec![]);
    let app = router(Some("gsk_test"), provider.clone());

    let bad_bodies = [
        json!({"messages": [{"role": "user"}]}),
        json!({"messages": [{"role": 1, "content": "x"}]}),
        json!({}),
    ];

    for body in bad_bodies {
        let response = app.clone().oneshot(chat_request(body)).await.unwrap();
        assert!(response.status().is_client_error());
    }

    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_cors_allows_any_origin_with_credentials() {
    let app = router(None, MockProvider::streaming(vec![]));

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );

    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/chat")
        .header(header::ORIGIN, "http://10.0.2.2:8080")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(preflight).await.unwrap();
    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://10.0.2.2:8080");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "content-type");
}
