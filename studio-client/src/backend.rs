use crate::error::ClientError;
use async_trait::async_trait;
use futures_util::Stream;
use shared_types::{
    AgentEvent, ChatSession, CreateSessionRequest, MessagesResponse, SendMessageRequest,
    SendMessageResponse, ToolResultSubmission,
};
use std::pin::Pin;
use std::sync::Arc;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<AgentEvent, ClientError>> + Send>>;

/// Transport seam between the chat core and the agent backend
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Current status plus the latest messages of a session
    async fn fetch_messages(
        &self,
        session_id: &str,
        limit: Option<u32>,
    ) -> Result<MessagesResponse, ClientError>;

    async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<SendMessageResponse, ClientError>;

    async fn cancel(&self, session_id: &str) -> Result<(), ClientError>;

    async fn submit_tool_results(
        &self,
        submission: ToolResultSubmission,
    ) -> Result<(), ClientError>;

    async fn list_sessions(&self) -> Result<Vec<ChatSession>, ClientError>;

    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<ChatSession, ClientError>;

    async fn delete_session(&self, session_id: &str) -> Result<(), ClientError>;

    /// Check if server-sent progress events are available
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Progress events of a running session (optional, returns error if not supported)
    async fn stream_events(&self, _session_id: &str) -> Result<EventStream, ClientError> {
        Err(ClientError::StreamUnsupported)
    }
}

/// Source of the session list, injectable so that tests and offline mode
/// can run without the backend.
#[async_trait]
pub trait SessionLoader: Send + Sync {
    async fn load(&self) -> Result<Vec<ChatSession>, ClientError>;
}

/// Loads sessions from the agent backend
pub struct RemoteSessionLoader {
    backend: Arc<dyn AgentBackend>,
}

impl RemoteSessionLoader {
    pub fn new(backend: Arc<dyn AgentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl SessionLoader for RemoteSessionLoader {
    async fn load(&self) -> Result<Vec<ChatSession>, ClientError> {
        self.backend.list_sessions().await
    }
}
