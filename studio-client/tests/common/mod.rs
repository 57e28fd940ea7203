#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::stream;
use shared_types::{
    AgentEvent, ChatMessage, ChatSession, CreateSessionRequest, MessagesResponse,
    SendMessageRequest, SendMessageResponse, SessionStatus, ToolResultSubmission,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use studio_client::{
    AgentBackend, ClientError, EventStream, PollConfig, StoreEvent, StudioClient, SyncMode,
};
use tokio::sync::broadcast;

/// Scripted in-memory backend counting every call
pub struct MockBackend {
    /// Status returned by each fetch, in order. The last one repeats.
    pub statuses: Mutex<VecDeque<SessionStatus>>,
    /// Script installed by `cancel`
    pub after_cancel: Mutex<Vec<SessionStatus>>,
    pub messages: Mutex<Vec<ChatMessage>>,
    pub sessions: Mutex<Vec<ChatSession>>,
    pub events: Mutex<Option<Vec<Result<AgentEvent, ClientError>>>>,
    pub sent: Mutex<Vec<SendMessageRequest>>,
    pub tool_submissions: Mutex<Vec<ToolResultSubmission>>,
    pub fetch_delay: Duration,
    pub fail_fetch: AtomicBool,
    pub fail_send: AtomicBool,
    pub streaming: bool,

    pub fetch_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    concurrent_fetches: AtomicUsize,
    pub max_concurrent_fetches: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        MockBackend {
            statuses: Mutex::new(VecDeque::from(vec![SessionStatus::Idle])),
            after_cancel: Mutex::new(vec![SessionStatus::Processing, SessionStatus::Idle]),
            messages: Mutex::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
            events: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            tool_submissions: Mutex::new(Vec::new()),
            fetch_delay: Duration::from_millis(50),
            fail_fetch: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            streaming: false,
            fetch_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            concurrent_fetches: AtomicUsize::new(0),
            max_concurrent_fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_statuses(statuses: Vec<SessionStatus>) -> Self {
        let backend = Self::new();
        *backend.statuses.lock().unwrap() = VecDeque::from(statuses);
        backend
    }

    pub fn with_sessions(self, sessions: Vec<ChatSession>) -> Self {
        *self.sessions.lock().unwrap() = sessions;
        self
    }

    pub fn with_events(mut self, events: Vec<Result<AgentEvent, ClientError>>) -> Self {
        self.streaming = true;
        *self.events.lock().unwrap() = Some(events);
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn push_message(&self, message: ChatMessage) {
        self.messages.lock().unwrap().push(message);
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn network_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
            + self.send_calls.load(Ordering::SeqCst)
            + self.cancel_calls.load(Ordering::SeqCst)
            + self.create_calls.load(Ordering::SeqCst)
            + self.delete_calls.load(Ordering::SeqCst)
            + self.list_calls.load(Ordering::SeqCst)
    }

    fn next_status(&self) -> SessionStatus {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap()
        } else {
            statuses.front().copied().unwrap_or_default()
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentBackend for MockBackend {
    async fn fetch_messages(
        &self,
        _session_id: &str,
        _limit: Option<u32>,
    ) -> Result<MessagesResponse, ClientError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.concurrent_fetches.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_fetches.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.fetch_delay).await;
        self.concurrent_fetches.fetch_sub(1, Ordering::SeqCst);

        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ClientError::RequestFailed("connection refused".to_string()));
        }
        Ok(MessagesResponse {
            messages: self.messages.lock().unwrap().clone(),
            status: self.next_status(),
            title: None,
        })
    }

    async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<SendMessageResponse, ClientError> {
        let n = self.send_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(ClientError::HttpStatus(reqwest::StatusCode::BAD_GATEWAY));
        }

        let id = format!("msg_{}", n);
        self.push_message(ChatMessage::user(id.clone(), request.content.clone()));
        self.sent.lock().unwrap().push(request);
        Ok(SendMessageResponse {
            user_message_id: id,
            workflow_run_id: Some(format!("run_{}", n)),
        })
    }

    async fn cancel(&self, _session_id: &str) -> Result<(), ClientError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.after_cancel.lock().unwrap().clone();
        *self.statuses.lock().unwrap() = VecDeque::from(script);
        Ok(())
    }

    async fn submit_tool_results(
        &self,
        submission: ToolResultSubmission,
    ) -> Result<(), ClientError> {
        self.tool_submissions.lock().unwrap().push(submission);
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>, ClientError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<ChatSession, ClientError> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let session = ChatSession::new(format!("sess_{}", n), request.title);
        self.sessions.lock().unwrap().insert(0, session.clone());
        Ok(session)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ClientError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.id != session_id);
        if sessions.len() == before {
            return Err(ClientError::SessionNotFound(session_id.to_string()));
        }
        Ok(())
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn stream_events(&self, _session_id: &str) -> Result<EventStream, ClientError> {
        match self.events.lock().unwrap().take() {
            Some(events) => Ok(Box::pin(stream::iter(events))),
            None => Err(ClientError::StreamUnsupported),
        }
    }
}

pub fn poll_config() -> PollConfig {
    PollConfig::default()
}

pub fn stream_config() -> PollConfig {
    PollConfig {
        sync_mode: SyncMode::Stream,
        ..PollConfig::default()
    }
}

pub fn client(backend: &Arc<MockBackend>, poll: PollConfig) -> StudioClient {
    StudioClient::with_backend(backend.clone(), poll)
}

pub fn event(name: &str) -> AgentEvent {
    AgentEvent {
        index: 0,
        id: None,
        parent_id: None,
        event_type: "progress".to_string(),
        name: name.to_string(),
        step: 0,
        content: serde_json::Value::Null,
    }
}

/// Error notifications received so far
pub fn error_notifications(events: &mut broadcast::Receiver<StoreEvent>) -> Vec<String> {
    let mut errors = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let StoreEvent::Notification(n) = event {
            if n.level == studio_client::NotificationLevel::Error {
                errors.push(n.message);
            }
        }
    }
    errors
}
