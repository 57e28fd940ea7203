use crate::backend::AgentBackend;
use crate::error::ClientError;
use crate::local::{is_local_session, send_local};
use crate::poller::PollController;
use crate::store::{ChatSessionsStore, NotificationLevel};
use shared_types::{
    Attachment, MessageContent, SendMessageRequest, SessionStatus, ToolResultEntry,
    ToolResultSubmission,
};
use std::sync::Arc;
use tracing::{info, warn};

/// What a successful send produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub message_id: String,
    pub workflow_run_id: Option<String>,
    pub status: SessionStatus,
}

/// User-facing chat operations, wiring the store, the backend and the poll
/// controller together
#[derive(Clone)]
pub struct ChatService {
    backend: Arc<dyn AgentBackend>,
    store: ChatSessionsStore,
    poller: PollController,
}

impl ChatService {
    pub fn new(
        backend: Arc<dyn AgentBackend>,
        store: ChatSessionsStore,
        poller: PollController,
    ) -> Self {
        Self {
            backend,
            store,
            poller,
        }
    }

    pub fn store(&self) -> &ChatSessionsStore {
        &self.store
    }

    pub fn poller(&self) -> &PollController {
        &self.poller
    }

    /// Activates a session and starts polling if it is busy
    pub async fn open_session(&self, session_id: &str) -> Result<SessionStatus, ClientError> {
        match self.store.switch_session(session_id).await? {
            Some(status) => {
                if status.is_active() {
                    self.poller.resume_polling(session_id).await;
                }
                Ok(status)
            }
            None if is_local_session(session_id) => Ok(SessionStatus::Idle),
            None => self.poller.open_session(session_id).await,
        }
    }

    pub async fn send_message(
        &self,
        session_id: &str,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<SendOutcome, ClientError> {
        let Some(model_id) = self.store.selected_model().await else {
            return Err(self.reject(ClientError::NoModelSelected));
        };
        if text.trim().is_empty() && attachments.is_empty() {
            return Err(self.reject(ClientError::Validation(
                "Message must not be empty".to_string(),
            )));
        }

        let content = MessageContent::build(text, &attachments)
            .to_wire()
            .map_err(|e| self.reject(ClientError::from(e)))?;

        if is_local_session(session_id) {
            self.store.take_draft(session_id).await;
            let message_id = send_local(&self.store, session_id, content).await?;
            return Ok(SendOutcome {
                message_id,
                workflow_run_id: None,
                status: SessionStatus::Idle,
            });
        }

        let draft = self.store.take_draft(session_id).await;
        let temp_id = self.store.begin_optimistic(session_id, content.clone()).await;
        self.store.set_loading(session_id, true).await;

        let request = SendMessageRequest {
            session_id: session_id.to_string(),
            content,
            model_id,
        };
        let sent = match self.backend.send_message(request).await {
            Ok(sent) => sent,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Send failed, rolling back");
                self.store.rollback_pending(&temp_id).await;
                self.store
                    .notify(NotificationLevel::Error, format!("Failed to send message: {}", e));
                self.store.set_loading(session_id, false).await;
                self.store.restore_draft(session_id, draft).await;
                return Err(e);
            }
        };

        self.store
            .confirm_pending(&temp_id, &sent.user_message_id)
            .await;
        info!(
            session_id = %session_id,
            message_id = %sent.user_message_id,
            "Message sent"
        );

        let status = match self.poller.refresh_once(session_id).await {
            Ok(status) => status,
            Err(e) => {
                // Accepted by the backend, so it is working on it; the poll
                // loop reports persistent fetch failures.
                warn!(session_id = %session_id, error = %e, "Refresh after send failed");
                SessionStatus::Processing
            }
        };
        self.hand_off(session_id, status).await;

        Ok(SendOutcome {
            message_id: sent.user_message_id,
            workflow_run_id: sent.workflow_run_id,
            status,
        })
    }

    /// Posts results from a human-in-the-loop tool UI and resumes syncing
    pub async fn submit_tool_results(
        &self,
        session_id: &str,
        message_id: &str,
        tool_results: Vec<ToolResultEntry>,
    ) -> Result<SessionStatus, ClientError> {
        if is_local_session(session_id) {
            return Err(self.reject(ClientError::Validation(
                "Local sessions have no tools".to_string(),
            )));
        }

        let submission = ToolResultSubmission {
            session_id: session_id.to_string(),
            message_id: self.store.resolve_message_id(message_id).await,
            tool_results,
        };
        if let Err(e) = self.backend.submit_tool_results(submission).await {
            self.store
                .notify(NotificationLevel::Error, format!("Failed to submit tool results: {}", e));
            return Err(e);
        }

        self.store.set_loading(session_id, true).await;
        let status = match self.poller.refresh_once(session_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Refresh after tool results failed");
                SessionStatus::Processing
            }
        };
        self.hand_off(session_id, status).await;
        Ok(status)
    }

    pub async fn cancel(&self, session_id: &str) -> Result<SessionStatus, ClientError> {
        if is_local_session(session_id) {
            return Ok(SessionStatus::Idle);
        }
        self.poller.cancel(session_id).await
    }

    async fn hand_off(&self, session_id: &str, status: SessionStatus) {
        if status.is_active() {
            self.poller.resume_polling(session_id).await;
        } else {
            self.store.set_loading(session_id, false).await;
        }
    }

    fn reject(&self, err: ClientError) -> ClientError {
        self.store.notify(NotificationLevel::Error, err.to_string());
        err
    }
}
