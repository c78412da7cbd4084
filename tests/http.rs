//! HTTP-level integration tests for codescribe.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot` against a
//! recording mock [`CompletionClient`], so no test touches the network except
//! the `socket_*` tests, which bind an ephemeral localhost port. Coding-standard
//! PDFs live in `tests/fixtures/`.
//!
//! Run with:
//!   cargo test --test http -- --nocapture

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use codescribe::prompts::{comment_task, CLOSING_DIRECTIVE, RENAME_TASK};
use codescribe::{
    router, serve_on, ApiKey, CompletionClient, DetailLevel, GatewayError, ServiceConfig,
    CHAT_ROUTE,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const ORIGIN: &str = "http://localhost:4200";
const BOUNDARY: &str = "codescribe-test-boundary";
const CODE: &str = "def f(x): return x+1";
const STANDARD_PDF: &[u8] = include_bytes!("fixtures/standard.pdf");

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Records every (prompt, key) pair and answers with a fixed result.
struct MockClient {
    calls: Mutex<Vec<(String, String)>>,
    result: Result<String, GatewayError>,
}

impl MockClient {
    fn answering(result: Result<String, GatewayError>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            result,
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn keys(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, k)| k.clone())
            .collect()
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    async fn complete(&self, prompt: &str, credential: &ApiKey) -> Result<String, GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), credential.expose().to_string()));
        self.result.clone()
    }
}

fn config() -> ServiceConfig {
    ServiceConfig::builder()
        .allowed_origin(ORIGIN)
        .max_upload_bytes(64 * 1024)
        .build()
        .expect("test config must build")
}

fn app(client: Arc<MockClient>) -> Router {
    router(&config(), client).expect("router must build")
}

/// One multipart part.
enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn chat_request(parts: &[Part<'_>]) -> Request<Body> {
    let body = multipart_body(parts);
    Request::builder()
        .method(Method::POST)
        .uri(CHAT_ROUTE)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ── Validation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_api_key_is_400() {
    let client = MockClient::answering(Ok("unused".into()));
    let (status, body) = send(
        app(client.clone()),
        chat_request(&[Part::Text("prompt", CODE)]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, serde_json::json!({ "error": "API key is required" }));
    assert!(client.prompts().is_empty(), "gateway must not be called");
}

#[tokio::test]
async fn blank_prompt_is_400() {
    let client = MockClient::answering(Ok("unused".into()));
    let (status, body) = send(
        app(client.clone()),
        chat_request(&[Part::Text("apiKey", "sk-test"), Part::Text("prompt", "   ")]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Prompt is required");
    assert!(client.prompts().is_empty());
}

#[tokio::test]
async fn non_multipart_body_is_treated_as_empty_form() {
    let client = MockClient::answering(Ok("unused".into()));
    let request = Request::builder()
        .method(Method::POST)
        .uri(CHAT_ROUTE)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"apiKey":"sk-test"}"#))
        .unwrap();

    let (status, body) = send(app(client.clone()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "API key is required");
    assert!(client.prompts().is_empty());
}

// ── Success path ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn basic_comments_end_to_end() {
    let client = MockClient::answering(Ok("def f(x):\n    return x + 1  # increment".into()));
    let (status, body) = send(
        app(client.clone()),
        chat_request(&[
            Part::Text("apiKey", "sk-test"),
            Part::Text("prompt", CODE),
            Part::Text("addComments", "true"),
            Part::Text("detailLevel", "basic"),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({ "response": "def f(x):\n    return x + 1  # increment" })
    );

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(CODE));
    assert!(prompts[0].contains(comment_task(DetailLevel::Basic)));
    assert!(!prompts[0].contains(RENAME_TASK));
    assert_eq!(client.keys(), vec!["sk-test".to_string()]);
}

#[tokio::test]
async fn unknown_detail_level_falls_back_to_basic() {
    let client = MockClient::answering(Ok("ok".into()));
    let (status, _) = send(
        app(client.clone()),
        chat_request(&[
            Part::Text("apiKey", "sk-test"),
            Part::Text("prompt", CODE),
            Part::Text("addComments", "TRUE"),
            Part::Text("detailLevel", "galaxy-brain"),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let prompt = &client.prompts()[0];
    assert!(prompt.contains(comment_task(DetailLevel::Basic)));
    assert!(!prompt.contains(comment_task(DetailLevel::Advanced)));
}

#[tokio::test]
async fn rename_and_advanced_comments_together() {
    let client = MockClient::answering(Ok("ok".into()));
    let (status, _) = send(
        app(client.clone()),
        chat_request(&[
            Part::Text("apiKey", "sk-test"),
            Part::Text("prompt", CODE),
            Part::Text("renameVariables", "true"),
            Part::Text("addComments", "true"),
            Part::Text("detailLevel", "Advanced"),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let prompt = &client.prompts()[0];
    assert!(prompt.contains(RENAME_TASK));
    assert!(prompt.contains(comment_task(DetailLevel::Advanced)));
    assert!(!prompt.contains(comment_task(DetailLevel::Intermediate)));
}

#[tokio::test]
async fn no_flags_still_calls_gateway() {
    let client = MockClient::answering(Ok(CODE.into()));
    let (status, body) = send(
        app(client.clone()),
        chat_request(&[
            Part::Text("apiKey", "sk-test"),
            Part::Text("prompt", CODE),
            Part::Text("renameVariables", "false"),
            Part::Text("detailLevel", "advanced"),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], CODE);
    let prompt = &client.prompts()[0];
    assert!(prompt.contains(CODE));
    assert!(prompt.contains(CLOSING_DIRECTIVE));
    assert!(!prompt.contains(comment_task(DetailLevel::Advanced)));
}

#[tokio::test]
async fn unreadable_pdf_is_ignored() {
    let client = MockClient::answering(Ok("ok".into()));
    let (status, _) = send(
        app(client.clone()),
        chat_request(&[
            Part::Text("apiKey", "sk-test"),
            Part::Text("prompt", CODE),
            Part::File("standard.pdf", b"definitely not a PDF"),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!client.prompts()[0].to_lowercase().contains("coding standard"));
}

#[tokio::test]
async fn pdf_standard_reaches_the_prompt() {
    let client = MockClient::answering(Ok("ok".into()));
    let (status, _) = send(
        app(client.clone()),
        chat_request(&[
            Part::Text("apiKey", "sk-test"),
            Part::Text("prompt", CODE),
            Part::Text("renameVariables", "true"),
            Part::File("standard.pdf", STANDARD_PDF),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let prompt = &client.prompts()[0];
    assert!(
        prompt.starts_with(
            "Here is the coding standard:\nUse snake_case everywhere\nwhich should be followed strictly."
        ),
        "got: {prompt}"
    );
    let standard_at = prompt.find("snake_case").unwrap();
    assert!(standard_at < prompt.find(RENAME_TASK).unwrap());
    assert!(prompt.find(RENAME_TASK).unwrap() < prompt.find(CODE).unwrap());
}

#[tokio::test]
async fn first_uploaded_file_wins() {
    let client = MockClient::answering(Ok("ok".into()));
    let (status, _) = send(
        app(client.clone()),
        chat_request(&[
            Part::Text("apiKey", "sk-test"),
            Part::Text("prompt", CODE),
            Part::File("notes.txt", b"Always use tabs."),
            Part::File("standard.pdf", STANDARD_PDF),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!client.prompts()[0].contains("snake_case"));
}

#[tokio::test]
async fn non_pdf_upload_is_ignored() {
    let client = MockClient::answering(Ok("ok".into()));
    let (status, _) = send(
        app(client.clone()),
        chat_request(&[
            Part::Text("apiKey", "sk-test"),
            Part::Text("prompt", CODE),
            Part::File("standard.txt", b"Always use tabs."),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let prompt = &client.prompts()[0];
    assert!(!prompt.contains("Always use tabs."));
    assert!(!prompt.to_lowercase().contains("coding standard"));
}

// ── Gateway failures ─────────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_credential_maps_to_specific_message() {
    let client = MockClient::answering(Err(GatewayError::InvalidCredential));
    let (status, body) = send(
        app(client),
        chat_request(&[Part::Text("apiKey", "sk-wrong"), Part::Text("prompt", CODE)]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["error"],
        "Invalid API key. Please check your API key in profile settings."
    );
}

#[tokio::test]
async fn generic_failure_is_opaque() {
    let client = MockClient::answering(Err(GatewayError::Failed {
        detail: "upstream 503: secret internal hostname".into(),
    }));
    let (status, body) = send(
        app(client),
        chat_request(&[Part::Text("apiKey", "sk-test"), Part::Text("prompt", CODE)]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to get a response from OpenAI");
    assert!(!body.to_string().contains("hostname"));
}

// ── Layers ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn cors_preflight_allows_configured_origin_with_credentials() {
    let client = MockClient::answering(Ok("unused".into()));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri(CHAT_ROUTE)
        .header(header::ORIGIN, ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app(client).oneshot(request).await.unwrap();
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        ORIGIN
    );
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );
}

#[tokio::test]
async fn cors_never_echoes_other_origins() {
    let client = MockClient::answering(Ok("ok".into()));
    let mut request = chat_request(&[Part::Text("apiKey", "sk-test"), Part::Text("prompt", CODE)]);
    request
        .headers_mut()
        .insert(header::ORIGIN, "http://evil.example".parse().unwrap());

    let response = app(client).oneshot(request).await.unwrap();
    let allowed = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .unwrap();
    assert_eq!(allowed, ORIGIN);
    assert_ne!(allowed, "http://evil.example");
}

#[tokio::test]
async fn cors_preflight_from_other_origin_gets_configured_origin() {
    let client = MockClient::answering(Ok("unused".into()));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri(CHAT_ROUTE)
        .header(header::ORIGIN, "http://evil.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app(client.clone()).oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        ORIGIN
    );
    assert!(client.prompts().is_empty());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let client = MockClient::answering(Ok("unused".into()));
    let big = vec![b'a'; 128 * 1024];
    let (status, body) = send(
        app(client.clone()),
        chat_request(&[
            Part::Text("apiKey", "sk-test"),
            Part::Text("prompt", CODE),
            Part::File("standard.pdf", &big),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body, serde_json::json!({ "error": "Request body too large" }));
    assert!(client.prompts().is_empty());
}

#[tokio::test]
async fn other_routes_are_404() {
    let client = MockClient::answering(Ok("unused".into()));
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/status")
        .body(Body::empty())
        .unwrap();
    let response = app(client).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ── Real socket ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn socket_round_trip() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("codescribe=debug")
        .with_test_writer()
        .try_init();

    let client = MockClient::answering(Ok("# documented\nx = 1".into()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server_client = client.clone();
    let server = tokio::spawn(async move {
        let config = config();
        serve_on(listener, &config, server_client, async move {
            let _ = stop_rx.await;
        })
        .await
    });

    let form = reqwest::multipart::Form::new()
        .text("apiKey", "sk-test")
        .text("prompt", "x = 1")
        .text("addComments", "true")
        .text("detailLevel", "intermediate");

    let response = reqwest::Client::new()
        .post(format!("http://{addr}{CHAT_ROUTE}"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["response"], "# documented\nx = 1");
    assert!(client.prompts()[0].contains(comment_task(DetailLevel::Intermediate)));

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn socket_oversized_upload_is_json() {
    let client = MockClient::answering(Ok("unused".into()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server_client = client.clone();
    let server = tokio::spawn(async move {
        let config = config();
        serve_on(listener, &config, server_client, async move {
            let _ = stop_rx.await;
        })
        .await
    });

    let form = reqwest::multipart::Form::new()
        .text("apiKey", "sk-test")
        .text("prompt", "x = 1\n".repeat(14 * 1024));

    let response = reqwest::Client::new()
        .post(format!("http://{addr}{CHAT_ROUTE}"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::PAYLOAD_TOO_LARGE);
    assert!(response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("application/json"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Request body too large");
    assert!(client.prompts().is_empty());

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
