use super::*;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode as HttpStatus, routing::post, Json, Router};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    received: Arc<Mutex<Vec<serde_json::Value>>>,
}

async fn chat_ok(
    State(state): State<ServerState>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    state.received.lock().await.push(body);
    Json(serde_json::json!({ "response": "Try a robot chef" }))
}

async fn image_echo(
    State(state): State<ServerState>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let filename = body["filename"].as_str().unwrap_or_default().to_string();
    state.received.lock().await.push(body);
    Json(serde_json::json!({ "response": format!("analyzed {filename}") }))
}

async fn slow() -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(serde_json::json!({ "response": "too late" }))
}

async fn failing() -> (HttpStatus, &'static str) {
    (HttpStatus::INTERNAL_SERVER_ERROR, "workflow crashed")
}

async fn accepted() -> (HttpStatus, Json<serde_json::Value>) {
    (
        HttpStatus::ACCEPTED,
        Json(serde_json::json!({ "response": "queued" })),
    )
}

async fn missing_field() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "output": "wrong key" }))
}

async fn spawn_webhook_server() -> (String, ServerState) {
    let state = ServerState::default();
    let app = Router::new()
        .route("/chat", post(chat_ok))
        .route("/image", post(image_echo))
        .route("/slow", post(slow))
        .route("/failing", post(failing))
        .route("/accepted", post(accepted))
        .route("/missing", post(missing_field))
        .with_state(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

fn client_for(base: &str, chat_path: &str) -> HttpWebhookClient {
    HttpWebhookClient::new(WebhookConfig {
        chat_url: format!("{base}{chat_path}"),
        image_url: format!("{base}/image"),
        user: "tester".into(),
        chat_timeout: Duration::from_millis(300),
        image_timeout: Duration::from_secs(5),
    })
}

#[tokio::test]
async fn chat_posts_message_and_user() {
    let (base, state) = spawn_webhook_server().await;
    let client = client_for(&base, "/chat");

    let reply = client
        .send_chat(&ChatPayload {
            text: "robot ideas".into(),
        })
        .await
        .expect("reply");
    assert_eq!(reply, "Try a robot chef");

    let received = state.received.lock().await;
    assert_eq!(
        received[0],
        serde_json::json!({ "message": "robot ideas", "user": "tester" })
    );
}

#[tokio::test]
async fn image_posts_base64_payload() {
    let (base, state) = spawn_webhook_server().await;
    let client = client_for(&base, "/chat");
    let request = PendingRequest::image(b"hello".to_vec(), "frame.png", "describe");

    let reply = dispatch(&client, &request).await.expect("reply");
    assert_eq!(reply, "analyzed frame.png");

    let received = state.received.lock().await;
    assert_eq!(received[0]["image"], "aGVsbG8=");
    assert_eq!(received[0]["prompt"], "describe");
    assert_eq!(received[0]["user"], "tester");
}

#[tokio::test]
async fn slow_webhook_times_out() {
    let (base, _state) = spawn_webhook_server().await;
    let client = client_for(&base, "/slow");

    let err = client
        .send_chat(&ChatPayload { text: "hi".into() })
        .await
        .expect_err("timeout");
    assert_eq!(
        err,
        WebhookError::Timeout {
            after: Duration::from_millis(300)
        }
    );
    assert_eq!(err.to_string(), "request timed out after 300ms");
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let (base, _state) = spawn_webhook_server().await;
    let client = client_for(&base, "/failing");

    let err = client
        .send_chat(&ChatPayload { text: "hi".into() })
        .await
        .expect_err("status");
    assert_eq!(
        err,
        WebhookError::Status {
            status: 500,
            body: "workflow crashed".into()
        }
    );
}

#[tokio::test]
async fn only_200_counts_as_success() {
    let (base, _state) = spawn_webhook_server().await;
    let client = client_for(&base, "/accepted");

    let err = client
        .send_chat(&ChatPayload { text: "hi".into() })
        .await
        .expect_err("202 is not 200");
    assert!(matches!(err, WebhookError::Status { status: 202, .. }));
}

#[tokio::test]
async fn missing_response_field_is_reported() {
    let (base, _state) = spawn_webhook_server().await;
    let client = client_for(&base, "/missing");

    let err = client
        .send_chat(&ChatPayload { text: "hi".into() })
        .await
        .expect_err("missing");
    assert_eq!(err, WebhookError::MissingResponse);
}

#[test]
fn parse_reply_rejects_malformed_bodies() {
    assert!(matches!(
        parse_reply("<html>oops</html>"),
        Err(WebhookError::MalformedResponse(_))
    ));
    assert!(matches!(
        parse_reply(r#"{"response": 42}"#),
        Err(WebhookError::MalformedResponse(_))
    ));
    assert_eq!(
        parse_reply(r#"{"response": "ok", "extra": true}"#),
        Ok("ok".to_string())
    );
}

#[test]
fn long_error_bodies_are_truncated() {
    let body = "x".repeat(500);
    let truncated = truncate_chars(&body, MAX_ERROR_BODY_CHARS);
    assert_eq!(truncated.len(), MAX_ERROR_BODY_CHARS + 3);
    assert!(truncated.ends_with("..."));
}
