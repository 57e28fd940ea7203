//! Sessions that live only in the client.
//!
//! A `local-` id never reaches the backend. Sending to such a session
//! records the user message and a synthesized assistant reply directly in
//! the store.

use crate::backend::SessionLoader;
use crate::error::ClientError;
use crate::store::ChatSessionsStore;
use async_trait::async_trait;
use chrono::Utc;
use shared_types::{ChatMessage, ChatSession, MessageContent, MessagesResponse, SessionStatus};

pub const LOCAL_SESSION_PREFIX: &str = "local-";

pub fn is_local_session(session_id: &str) -> bool {
    session_id.starts_with(LOCAL_SESSION_PREFIX)
}

pub fn new_local_session_id() -> String {
    format!("{}{}", LOCAL_SESSION_PREFIX, uuid::Uuid::new_v4())
}

pub fn canned_reply(content: &str) -> String {
    let parsed = MessageContent::parse(content);
    let attached = parsed.attachment_count();
    let mut reply = format!(
        "This conversation is local to this device and is not sent to an agent. You wrote: \"{}\"",
        parsed.text().trim()
    );
    if attached > 0 {
        reply.push_str(&format!(" ({} attachment(s))", attached));
    }
    reply
}

/// Records a user message plus the canned reply. Returns the user message id.
pub(crate) async fn send_local(
    store: &ChatSessionsStore,
    session_id: &str,
    content: String,
) -> Result<String, ClientError> {
    let now = Utc::now();
    let user_id = format!("{}msg-{}", LOCAL_SESSION_PREFIX, uuid::Uuid::new_v4());
    let reply_id = format!("{}msg-{}", LOCAL_SESSION_PREFIX, uuid::Uuid::new_v4());

    let reply = ChatMessage::assistant(reply_id, canned_reply(&content))
        .with_created_at(now + chrono::Duration::milliseconds(1));
    let user = ChatMessage::user(user_id.clone(), content).with_created_at(now);

    store
        .apply_fetch(
            session_id,
            MessagesResponse {
                messages: vec![user, reply],
                status: SessionStatus::Idle,
                title: None,
            },
        )
        .await;
    tracing::debug!(session_id = %session_id, "Local reply recorded");
    Ok(user_id)
}

/// Fixed in-memory session list, for offline mode and tests
#[derive(Debug, Clone, Default)]
pub struct LocalSessionLoader {
    sessions: Vec<ChatSession>,
}

impl LocalSessionLoader {
    pub fn new(sessions: Vec<ChatSession>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl SessionLoader for LocalSessionLoader {
    async fn load(&self) -> Result<Vec<ChatSession>, ClientError> {
        Ok(self.sessions.clone())
    }
}
