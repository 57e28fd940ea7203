mod common;

use chrono::{Duration, Utc};
use common::{client, poll_config, MockBackend};
use shared_types::{ChatMessage, ChatSession, MessageRole, SessionStatus, ToolCall};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use studio_client::{LoadOptions, LocalSessionLoader, StoreEvent};

fn sessions() -> Vec<ChatSession> {
    vec![
        ChatSession::new("s1", "First"),
        ChatSession::new("s2", "Second"),
        ChatSession::new("s3", "Third"),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_initial_session_is_activated_and_loaded() {
    let backend = Arc::new(MockBackend::new().with_sessions(sessions()));
    let t0 = Utc::now();
    backend.push_message(ChatMessage::user("m1", "hi").with_created_at(t0));
    let client = client(&backend, poll_config());

    client
        .store()
        .load_sessions(LoadOptions {
            initial_session_id: Some("s2".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(client.store().sessions().await.len(), 3);
    assert_eq!(client.store().active_session_id().await.as_deref(), Some("s2"));
    assert_eq!(backend.fetches(), 1);
    assert_eq!(client.store().messages("s2").await.len(), 1);

    // Already cached: switching back does not fetch again
    client.store().switch_session("s1").await.unwrap();
    client.store().switch_session("s2").await.unwrap();
    assert_eq!(backend.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_route_session_unknown_to_list_is_inserted() {
    let backend = Arc::new(MockBackend::new().with_sessions(sessions()));
    let client = client(&backend, poll_config());

    client
        .store()
        .load_sessions(LoadOptions {
            external_session_id: Some("s9".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(client.store().sessions().await[0].id, "s9");

    // Same route value again is a no-op
    client
        .store()
        .load_sessions(LoadOptions {
            external_session_id: Some("s9".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(backend.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_injected_loader_bypasses_backend() {
    let backend = Arc::new(MockBackend::new());
    let client = client(&backend, poll_config());

    client
        .store()
        .load_sessions(LoadOptions {
            loader: Some(Arc::new(LocalSessionLoader::new(sessions()))),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(client.store().sessions().await.len(), 3);
    assert_eq!(backend.network_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_remote_delete_then_neighbour_activation() {
    let backend = Arc::new(MockBackend::new().with_sessions(sessions()));
    let client = client(&backend, poll_config());
    client
        .store()
        .load_sessions(LoadOptions {
            initial_session_id: Some("s3".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    client.store().set_session_input_value("s3", "draft").await;

    let next = client.store().delete_session("s3").await.unwrap();
    assert_eq!(next.as_deref(), Some("s2"));
    assert_eq!(backend.delete_calls.load(Ordering::SeqCst), 1);
    assert!(client.store().session("s3").await.is_none());
    assert!(!client.store().has_unsent_draft("s3").await);
}

#[tokio::test(start_paused = true)]
async fn test_tool_messages_fold_into_assistant() {
    let backend = Arc::new(MockBackend::with_statuses(vec![SessionStatus::Idle]));
    let t0 = Utc::now();
    backend.push_message(ChatMessage::user("u1", "make a cat").with_created_at(t0));
    backend.push_message(
        ChatMessage::assistant("a1", "")
            .with_tool_calls(vec![ToolCall::new(
                "call_1",
                "generate_image",
                r#"{"prompt":"cat"}"#,
            )])
            .with_created_at(t0 + Duration::seconds(1)),
    );
    backend.push_message(
        ChatMessage::new(
            "t1",
            MessageRole::Tool,
            r#"{"toolCallId": "call_1", "result": {"url": "https://cdn/cat.png"}}"#,
        )
        .with_created_at(t0 + Duration::seconds(2)),
    );
    let client = client(&backend, poll_config());
    let mut events = client.store().subscribe();

    client.poller().refresh_once("s1").await.unwrap();

    let messages = client.store().messages("s1").await;
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.role != MessageRole::Tool));
    let results = messages[1].tool_results.as_ref().unwrap();
    assert_eq!(results[0].tool_name, "generate_image");
    assert!(results[0].success);

    // Re-delivery is idempotent
    client.poller().refresh_once("s1").await.unwrap();
    assert_eq!(client.store().messages("s1").await, messages);

    let mut changed = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, StoreEvent::MessagesChanged { .. }) {
            changed += 1;
        }
    }
    assert_eq!(changed, 2);
}
