//! Bot API transport against a mock HTTP server.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use feedbridge_backend::{BackendClient, ClientConfig};
use feedbridge_bot::telegram::{TelegramClient, run_delivery, run_polling};
use feedbridge_bot::{CommandHandler, TransportError, messages};
use feedbridge_core::{ErrorCategory, Notification, Outbox, UserId};
use feedbridge_session::{MemoryStateStore, PushControl, Session};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123:abc";

fn client(server: &MockServer) -> TelegramClient {
    TelegramClient::new(&server.uri(), TOKEN).unwrap()
}

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": result}))
}

#[tokio::test]
async fn get_updates_passes_offset_and_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bot123:abc/getUpdates"))
        .and(query_param("offset", "41"))
        .and(query_param("timeout", "1"))
        .respond_with(ok(json!([{
            "update_id": 41,
            "message": {
                "message_id": 1,
                "from": {"id": 7},
                "chat": {"id": 7},
                "text": "/help"
            }
        }, {
            "update_id": 42,
            "edited_message": {"message_id": 1, "chat": {"id": 7}}
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let updates = client(&server)
        .get_updates(41, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(updates.len(), 2);
    let inbound = updates[0].message.as_ref().unwrap().to_inbound().unwrap();
    assert_eq!(inbound.user_id, UserId::new(7));
    assert!(updates[1].message.is_none());
}

#[tokio::test]
async fn send_message_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_json(json!({
            "chat_id": 5,
            "text": "hello",
            "disable_web_page_preview": true
        })))
        .respond_with(ok(json!({"message_id": 9, "chat": {"id": 5}})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .send_message(&Notification::text(UserId::new(5), "hello").without_preview())
        .await
        .unwrap();
}

#[tokio::test]
async fn api_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "ok": false,
            "error_code": 403,
            "description": "Forbidden: bot was blocked by the user"
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .send_message(&Notification::text(UserId::new(5), "hello"))
        .await
        .unwrap_err();
    assert_matches!(err, TransportError::Api { code: 403, ref description } if description.contains("blocked"));
    assert_eq!(err.category(), ErrorCategory::Unauthorized);
}

#[tokio::test]
async fn delivery_drains_outbox_until_producers_leave() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ok(json!({"message_id": 1})))
        .expect(3)
        .mount(&server)
        .await;

    let (outbox, rx) = Outbox::channel(8);
    for i in 0..3 {
        assert!(outbox.send_text(UserId::new(i), format!("message {i}")));
    }
    drop(outbox);

    let delivered = tokio::time::timeout(
        Duration::from_secs(5),
        run_delivery(&client(&server), rx, CancellationToken::new()),
    )
    .await
    .unwrap();
    assert_eq!(delivered, 3);
}

#[tokio::test]
async fn delivery_sends_queued_messages_after_cancel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ok(json!({"message_id": 1})))
        .expect(2)
        .mount(&server)
        .await;

    // The producer stays alive; only the cancel ends the loop.
    let (outbox, rx) = Outbox::channel(8);
    assert!(outbox.send_text(UserId::new(1), "late one"));
    assert!(outbox.send_text(UserId::new(2), "late two"));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let delivered = tokio::time::timeout(
        Duration::from_secs(5),
        run_delivery(&client(&server), rx, cancel),
    )
    .await
    .unwrap();
    assert_eq!(delivered, 2);
    drop(outbox);
}

#[tokio::test]
async fn delivery_failures_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (outbox, rx) = Outbox::channel(8);
    assert!(outbox.send_text(UserId::new(1), "lost"));
    drop(outbox);
    assert_eq!(
        run_delivery(&client(&server), rx, CancellationToken::new()).await,
        0
    );
}

struct NoPush;

impl PushControl for NoPush {
    fn start(&self, _session: &Session) -> bool {
        false
    }

    fn stop(&self, _user_id: UserId) -> bool {
        false
    }
}

#[tokio::test]
async fn polling_dispatches_messages_to_handler() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bot123:abc/getUpdates"))
        .and(query_param("offset", "0"))
        .respond_with(ok(json!([{
            "update_id": 1,
            "message": {"message_id": 1, "from": {"id": 7}, "chat": {"id": 7}, "text": "/help"}
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bot123:abc/getUpdates"))
        .and(query_param("offset", "2"))
        .respond_with(ok(json!([])).set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;

    let backend = BackendClient::new(&ClientConfig::for_host("backend.invalid")).unwrap();
    let (outbox, mut rx) = Outbox::channel(8);
    let handler = Arc::new(CommandHandler::new(
        Arc::new(MemoryStateStore::new()),
        Arc::new(backend),
        Arc::new(NoPush),
        outbox,
        "backend.invalid",
    ));

    let cancel = CancellationToken::new();
    let tg = client(&server);
    let polling = tokio::spawn({
        let cancel = cancel.clone();
        async move { run_polling(&tg, handler, Duration::from_secs(1), cancel).await }
    });

    let reply = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.user_id, UserId::new(7));
    assert_eq!(reply.text, messages::HELP);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), polling)
        .await
        .unwrap()
        .unwrap();
}
