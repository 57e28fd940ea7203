mod common;

use common::{client, error_notifications, event, poll_config, stream_config, MockBackend};
use shared_types::events::LIFECYCLE_COMPLETE;
use shared_types::SessionStatus;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use studio_client::{ClientError, PollStart};

use SessionStatus::{Idle, Pending, Processing};

async fn settle() {
    tokio::time::sleep(Duration::from_secs(30)).await;
}

#[tokio::test(start_paused = true)]
async fn test_pending_pending_idle_fetches_three_times() {
    let backend = Arc::new(MockBackend::with_statuses(vec![Pending, Pending, Idle]));
    let client = client(&backend, poll_config());

    assert_eq!(client.poller().start_polling("s1").await, PollStart::Started);
    settle().await;

    assert_eq!(backend.fetches(), 3);
    assert!(!client.poller().is_polling("s1"));
    assert!(!client.store().is_loading("s1").await);
}

#[tokio::test(start_paused = true)]
async fn test_waits_interval_between_fetches() {
    let backend = Arc::new(MockBackend::with_statuses(vec![Processing, Processing, Idle]));
    let client = client(&backend, poll_config());

    client.poller().start_polling("s1").await;
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(backend.fetches(), 1);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(backend.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_double_start_never_overlaps() {
    let backend = Arc::new(MockBackend::with_statuses(vec![Processing, Processing, Idle]));
    let client = client(&backend, poll_config());

    let (first, second) = tokio::join!(
        client.poller().start_polling("s1"),
        client.poller().start_polling("s1")
    );
    assert_eq!(first, PollStart::Started);
    assert_eq!(second, PollStart::AlreadyRunning);

    settle().await;
    assert_eq!(backend.fetches(), 3);
    assert_eq!(backend.max_concurrent_fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sessions_poll_independently() {
    let backend = Arc::new(MockBackend::with_statuses(vec![Processing, Processing, Idle]));
    let client = client(&backend, poll_config());

    assert_eq!(client.poller().start_polling("s1").await, PollStart::Started);
    assert_eq!(client.poller().start_polling("s2").await, PollStart::Started);
    assert!(client.poller().is_polling("s1"));
    assert!(client.poller().is_polling("s2"));
    settle().await;
    assert!(!client.poller().is_polling("s1"));
    assert!(!client.poller().is_polling("s2"));
}

#[tokio::test(start_paused = true)]
async fn test_processing_on_open_polls_and_cancel_settles_idle() {
    let backend = Arc::new(MockBackend::with_statuses(vec![Processing]));
    let client = client(&backend, poll_config());

    let status = client.poller().open_session("s1").await.unwrap();
    assert_eq!(status, Processing);
    assert!(client.poller().is_polling("s1"));
    assert_eq!(backend.fetches(), 1);

    let status = client.poller().cancel("s1").await.unwrap();
    assert_eq!(status, Idle);
    assert_eq!(backend.cancel_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.fetches(), 3);
    assert_eq!(backend.max_concurrent_fetches.load(Ordering::SeqCst), 1);
    assert!(!client.poller().is_polling("s1"));

    settle().await;
    assert_eq!(backend.fetches(), 3);
    assert!(!client.store().is_loading("s1").await);
}

#[tokio::test(start_paused = true)]
async fn test_idle_on_open_does_not_poll() {
    let backend = Arc::new(MockBackend::with_statuses(vec![Idle]));
    let client = client(&backend, poll_config());

    assert_eq!(client.poller().open_session("s1").await.unwrap(), Idle);
    settle().await;
    assert_eq!(backend.fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_wakes_pending_delay() {
    let backend = Arc::new(MockBackend::with_statuses(vec![Processing]));
    let client = client(&backend, poll_config());

    client.poller().start_polling("s1").await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(backend.fetches(), 1);

    client.poller().stop("s1");
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!client.store().is_loading("s1").await);

    settle().await;
    assert_eq!(backend.fetches(), 1);

    // A stopped session can be polled again
    assert_eq!(client.poller().start_polling("s1").await, PollStart::Started);
}

#[tokio::test(start_paused = true)]
async fn test_restart_while_stopped_fetch_is_on_the_wire() {
    let backend = Arc::new(
        MockBackend::with_statuses(vec![Processing]).with_fetch_delay(Duration::from_secs(2)),
    );
    let client = client(&backend, poll_config());

    assert_eq!(client.poller().start_polling("s1").await, PollStart::Started);
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.poller().stop("s1");
    assert_eq!(client.poller().start_polling("s1").await, PollStart::Queued);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(backend.fetches(), 3);
    assert!(client.poller().is_polling("s1"));
    assert_eq!(backend.max_concurrent_fetches.load(Ordering::SeqCst), 1);
    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_stop_drops_queued_restart() {
    let backend = Arc::new(
        MockBackend::with_statuses(vec![Processing]).with_fetch_delay(Duration::from_secs(2)),
    );
    let client = client(&backend, poll_config());

    client.poller().start_polling("s1").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.poller().stop("s1");
    assert_eq!(client.poller().start_polling("s1").await, PollStart::Queued);
    client.poller().stop("s1");

    settle().await;
    assert_eq!(backend.fetches(), 1);
    assert!(!client.poller().is_polling("s1"));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_refuses_new_loops() {
    let backend = Arc::new(MockBackend::with_statuses(vec![Processing]));
    let client = client(&backend, poll_config());

    client.poller().start_polling("s1").await;
    client.shutdown();
    settle().await;

    assert!(backend.fetches() <= 1);
    assert_eq!(client.poller().start_polling("s2").await, PollStart::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_stops_with_one_notification() {
    let backend = Arc::new(MockBackend::with_statuses(vec![Processing]));
    backend.fail_fetch.store(true, Ordering::SeqCst);
    let client = client(&backend, poll_config());
    let mut events = client.store().subscribe();

    client.poller().start_polling("s1").await;
    settle().await;

    assert_eq!(backend.fetches(), 1);
    assert_eq!(error_notifications(&mut events).len(), 1);
    assert!(!client.store().is_loading("s1").await);
}

#[tokio::test(start_paused = true)]
async fn test_stream_events_drive_fetches() {
    let backend = Arc::new(
        MockBackend::with_statuses(vec![Processing, Idle]).with_events(vec![
            Ok(event("agent:lifecycle:start")),
            Ok(event(LIFECYCLE_COMPLETE)),
        ]),
    );
    let client = client(&backend, stream_config());

    client.poller().start_polling("s1").await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    // One fetch per event, no interval waits
    assert_eq!(backend.fetches(), 2);
    assert!(!client.poller().is_polling("s1"));
}

#[tokio::test(start_paused = true)]
async fn test_stream_error_falls_back_to_polling() {
    let backend = Arc::new(
        MockBackend::with_statuses(vec![Processing, Processing, Idle]).with_events(vec![Err(
            ClientError::Stream("Task not found".to_string()),
        )]),
    );
    let client = client(&backend, stream_config());

    client.poller().start_polling("s1").await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(backend.fetches(), 2);

    settle().await;
    assert_eq!(backend.fetches(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_stream_polls() {
    let backend = Arc::new(MockBackend::with_statuses(vec![Pending, Pending, Idle]));
    let client = client(&backend, stream_config());

    client.poller().start_polling("s1").await;
    settle().await;
    assert_eq!(backend.fetches(), 3);
}
