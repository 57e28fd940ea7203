//! In-memory owner of sessions, messages, drafts and loading flags.
//!
//! [`ChatSessionsStore`] is created once per application instance and cloned
//! into every consumer. Reads return snapshots; every mutation goes through
//! an intent method and is announced on the [`StoreEvent`] broadcast.
//! The state lock is never held across a backend call.

use crate::backend::{AgentBackend, RemoteSessionLoader, SessionLoader};
use crate::error::ClientError;
use crate::local::is_local_session;
use crate::reconciler::{merge_messages, reconcile};
use chrono::Utc;
use shared_types::{
    Attachment, ChatMessage, ChatSession, CreateSessionRequest, MessagesResponse, SessionStatus,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 256;
/// Rolled-back temporary ids remembered for `pending_state`
const ROLLED_BACK_HISTORY: usize = 32;
pub const TEMP_ID_PREFIX: &str = "temp-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// User-facing toast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    SessionsChanged,
    ActiveSessionChanged(Option<String>),
    MessagesChanged { session_id: String },
    StatusChanged { session_id: String, status: SessionStatus },
    LoadingChanged { session_id: String, loading: bool },
    DraftChanged { session_id: String },
    Notification(Notification),
}

/// Unsent composer contents of one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub input: String,
    pub attachments: Vec<Attachment>,
}

impl Draft {
    pub fn is_empty(&self) -> bool {
        self.input.trim().is_empty() && self.attachments.is_empty()
    }
}

/// Lifecycle of an optimistically shown user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingState {
    Optimistic,
    Confirmed(String),
    RolledBack,
}

#[derive(Debug, Clone)]
struct PendingSend {
    session_id: String,
    message: ChatMessage,
    state: PendingState,
}

#[derive(Default)]
pub struct LoadOptions {
    /// Overrides the backend session list
    pub loader: Option<Arc<dyn SessionLoader>>,
    pub initial_session_id: Option<String>,
    /// Session id supplied by the embedding route. A repeated load with the
    /// same value is skipped.
    pub external_session_id: Option<String>,
}

#[derive(Debug, Default)]
struct StoreState {
    sessions: Vec<ChatSession>,
    active_session_id: Option<String>,
    /// Reconciled server messages per session
    messages: HashMap<String, Vec<ChatMessage>>,
    /// Keyed by temporary id
    pending: HashMap<String, PendingSend>,
    /// Temporary id -> (session id, real id), for pending records already
    /// retired
    resolved: HashMap<String, (String, String)>,
    /// (session id, temporary id) of the most recent rollbacks, oldest first
    rolled_back: VecDeque<(String, String)>,
    drafts: HashMap<String, Draft>,
    loading: HashSet<String>,
    selected_model: Option<String>,
    last_external_session_id: Option<String>,
}

impl StoreState {
    fn position(&self, session_id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == session_id)
    }

    /// Drops confirmed records whose real id the server has delivered
    fn retire_confirmed(&mut self, session_id: &str) {
        let delivered: HashSet<&str> = self
            .messages
            .get(session_id)
            .map(|m| m.iter().map(|m| m.id.as_str()).collect())
            .unwrap_or_default();

        let retired: Vec<(String, String)> = self
            .pending
            .iter()
            .filter(|(_, p)| p.session_id == session_id)
            .filter_map(|(temp_id, p)| match &p.state {
                PendingState::Confirmed(real) if delivered.contains(real.as_str()) => {
                    Some((temp_id.clone(), real.clone()))
                }
                _ => None,
            })
            .collect();

        for (temp_id, real_id) in retired {
            self.pending.remove(&temp_id);
            self.resolved
                .insert(temp_id, (session_id.to_string(), real_id));
        }
    }

    fn forget_session(&mut self, session_id: &str) {
        self.messages.remove(session_id);
        self.drafts.remove(session_id);
        self.loading.remove(session_id);
        self.pending.retain(|_, p| p.session_id != session_id);
        self.resolved.retain(|_, (owner, _)| owner != session_id);
        self.rolled_back.retain(|(owner, _)| owner != session_id);
    }

    fn view(&self, session_id: &str) -> Vec<ChatMessage> {
        let server = self.messages.get(session_id).cloned().unwrap_or_default();
        let delivered: HashSet<&str> = server.iter().map(|m| m.id.as_str()).collect();

        let overlay: Vec<ChatMessage> = self
            .pending
            .values()
            .filter(|p| p.session_id == session_id)
            .filter_map(|p| match &p.state {
                PendingState::Optimistic => Some(p.message.clone()),
                PendingState::Confirmed(real) if !delivered.contains(real.as_str()) => {
                    let mut message = p.message.clone();
                    message.id = real.clone();
                    Some(message)
                }
                _ => None,
            })
            .collect();

        if overlay.is_empty() {
            server
        } else {
            merge_messages(&server, overlay)
        }
    }
}

/// Shared chat state service. Cloning is cheap and every clone sees the
/// same state.
#[derive(Clone)]
pub struct ChatSessionsStore {
    state: Arc<RwLock<StoreState>>,
    backend: Arc<dyn AgentBackend>,
    events: broadcast::Sender<StoreEvent>,
    message_limit: Option<u32>,
}

impl ChatSessionsStore {
    pub fn new(backend: Arc<dyn AgentBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            backend,
            events,
            message_limit: None,
        }
    }

    pub fn with_message_limit(mut self, limit: Option<u32>) -> Self {
        self.message_limit = limit;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        // No receivers is fine, the store runs headless in tests and the CLI
        let _ = self.events.send(event);
    }

    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NotificationLevel::Error => warn!(message = %message, "Notification"),
            _ => debug!(message = %message, "Notification"),
        }
        self.emit(StoreEvent::Notification(Notification { level, message }));
    }

    // Snapshots

    pub async fn sessions(&self) -> Vec<ChatSession> {
        self.state.read().await.sessions.clone()
    }

    pub async fn session(&self, session_id: &str) -> Option<ChatSession> {
        let state = self.state.read().await;
        state.sessions.iter().find(|s| s.id == session_id).cloned()
    }

    pub async fn active_session_id(&self) -> Option<String> {
        self.state.read().await.active_session_id.clone()
    }

    /// Reconciled messages with pending sends overlaid
    pub async fn messages(&self, session_id: &str) -> Vec<ChatMessage> {
        self.state.read().await.view(session_id)
    }

    pub async fn has_cached_messages(&self, session_id: &str) -> bool {
        self.state.read().await.messages.contains_key(session_id)
    }

    pub async fn is_loading(&self, session_id: &str) -> bool {
        self.state.read().await.loading.contains(session_id)
    }

    pub async fn selected_model(&self) -> Option<String> {
        self.state.read().await.selected_model.clone()
    }

    pub async fn set_selected_model(&self, model_id: Option<String>) {
        self.state.write().await.selected_model = model_id;
    }

    // Sessions

    pub async fn load_sessions(&self, options: LoadOptions) -> Result<(), ClientError> {
        if let Some(external) = &options.external_session_id {
            let state = self.state.read().await;
            if state.last_external_session_id.as_ref() == Some(external) {
                debug!(session_id = %external, "External session unchanged, skipping load");
                return Ok(());
            }
        }

        let loader = options
            .loader
            .unwrap_or_else(|| Arc::new(RemoteSessionLoader::new(self.backend.clone())));
        let loaded = match loader.load().await {
            Ok(sessions) => sessions,
            Err(e) => {
                self.notify(NotificationLevel::Error, format!("Failed to load sessions: {}", e));
                return Err(e);
            }
        };

        let target = options
            .external_session_id
            .clone()
            .or(options.initial_session_id);

        {
            let mut state = self.state.write().await;
            let local: Vec<ChatSession> = state
                .sessions
                .iter()
                .filter(|s| is_local_session(&s.id) && !loaded.iter().any(|l| l.id == s.id))
                .cloned()
                .collect();
            state.sessions = local.into_iter().chain(loaded).collect();

            for session in state.sessions.clone() {
                if is_local_session(&session.id) {
                    state.messages.entry(session.id).or_default();
                }
            }

            if let Some(target) = &target {
                if state.position(target).is_none() {
                    // Route parameters may name a session the list has not caught up with
                    state.sessions.insert(0, ChatSession::new(target.clone(), ""));
                }
                state.active_session_id = Some(target.clone());
            }
            if options.external_session_id.is_some() {
                state.last_external_session_id = options.external_session_id.clone();
            }
            info!(count = state.sessions.len(), "Sessions loaded");
        }

        self.emit(StoreEvent::SessionsChanged);
        if let Some(target) = target {
            self.emit(StoreEvent::ActiveSessionChanged(Some(target.clone())));
            if !is_local_session(&target) {
                self.fetch_into_store(&target).await?;
            }
        }
        Ok(())
    }

    pub async fn create_session(&self, title: &str) -> Result<ChatSession, ClientError> {
        let Some(model_id) = self.selected_model().await else {
            let err = ClientError::NoModelSelected;
            self.notify(NotificationLevel::Error, err.to_string());
            return Err(err);
        };

        let request = CreateSessionRequest {
            title: title.to_string(),
            model_id,
        };
        let session = match self.backend.create_session(request).await {
            Ok(session) => session,
            Err(e) => {
                self.notify(NotificationLevel::Error, format!("Failed to create session: {}", e));
                return Err(e);
            }
        };

        self.insert_and_activate(session.clone()).await;
        Ok(session)
    }

    /// Creates a session that only ever lives in this store
    pub async fn create_local_session(&self, title: &str) -> ChatSession {
        let session = ChatSession::new(crate::local::new_local_session_id(), title);
        self.insert_and_activate(session.clone()).await;
        session
    }

    async fn insert_and_activate(&self, session: ChatSession) {
        {
            let mut state = self.state.write().await;
            state.messages.insert(session.id.clone(), Vec::new());
            state.active_session_id = Some(session.id.clone());
            state.sessions.insert(0, session.clone());
        }
        info!(session_id = %session.id, "Session created");
        self.emit(StoreEvent::SessionsChanged);
        self.emit(StoreEvent::ActiveSessionChanged(Some(session.id)));
    }

    /// Deletes remotely first; the cache is only touched after success.
    /// Returns the session that became active, if any.
    pub async fn delete_session(&self, session_id: &str) -> Result<Option<String>, ClientError> {
        if !is_local_session(session_id) {
            match self.backend.delete_session(session_id).await {
                Ok(()) => {}
                Err(ClientError::SessionNotFound(_)) => {
                    debug!(session_id = %session_id, "Session already gone on the backend");
                }
                Err(e) => {
                    self.notify(NotificationLevel::Error, format!("Failed to delete session: {}", e));
                    return Err(e);
                }
            }
        }

        let (was_active, active) = {
            let mut state = self.state.write().await;
            let Some(pos) = state.position(session_id) else {
                return Err(ClientError::SessionNotFound(session_id.to_string()));
            };
            state.sessions.remove(pos);
            state.forget_session(session_id);

            let was_active = state.active_session_id.as_deref() == Some(session_id);
            if was_active {
                let next = state
                    .sessions
                    .get(pos)
                    .or_else(|| pos.checked_sub(1).and_then(|prev| state.sessions.get(prev)))
                    .map(|s| s.id.clone());
                state.active_session_id = next;
            }
            (was_active, state.active_session_id.clone())
        };

        info!(session_id = %session_id, "Session deleted");
        self.emit(StoreEvent::SessionsChanged);
        if was_active {
            self.emit(StoreEvent::ActiveSessionChanged(active.clone()));
        }
        Ok(active)
    }

    /// Activates a session, fetching its messages when none are cached.
    /// Returns the fetched status when a fetch happened.
    pub async fn switch_session(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionStatus>, ClientError> {
        let cached = {
            let mut state = self.state.write().await;
            if state.position(session_id).is_none() {
                return Err(ClientError::SessionNotFound(session_id.to_string()));
            }
            state.active_session_id = Some(session_id.to_string());
            state.messages.contains_key(session_id)
        };
        self.emit(StoreEvent::ActiveSessionChanged(Some(session_id.to_string())));

        if cached || is_local_session(session_id) {
            return Ok(None);
        }

        self.set_loading(session_id, true).await;
        let result = self.fetch_into_store(session_id).await;
        self.set_loading(session_id, false).await;
        result.map(Some)
    }

    async fn fetch_into_store(&self, session_id: &str) -> Result<SessionStatus, ClientError> {
        match self
            .backend
            .fetch_messages(session_id, self.message_limit)
            .await
        {
            Ok(response) => Ok(self.apply_fetch(session_id, response).await),
            Err(e) => {
                self.notify(NotificationLevel::Error, format!("Failed to load messages: {}", e));
                Err(e)
            }
        }
    }

    /// Reconciles a fetched batch into the session and records its status
    pub async fn apply_fetch(&self, session_id: &str, response: MessagesResponse) -> SessionStatus {
        let status = response.status;
        let status_changed = {
            let mut state = self.state.write().await;
            let current = state.messages.remove(session_id).unwrap_or_default();
            let merged = reconcile(&current, response.messages);
            state.messages.insert(session_id.to_string(), merged);
            state.retire_confirmed(session_id);

            match state.sessions.iter_mut().find(|s| s.id == session_id) {
                Some(session) => {
                    if let Some(title) = response.title.filter(|t| !t.is_empty()) {
                        session.title = title;
                    }
                    let changed = session.status != status;
                    session.status = status;
                    changed
                }
                None => false,
            }
        };

        self.emit(StoreEvent::MessagesChanged {
            session_id: session_id.to_string(),
        });
        if status_changed {
            debug!(session_id = %session_id, status = %status, "Session status changed");
            self.emit(StoreEvent::StatusChanged {
                session_id: session_id.to_string(),
                status,
            });
        }
        status
    }

    pub async fn set_loading(&self, session_id: &str, loading: bool) {
        let changed = {
            let mut state = self.state.write().await;
            if loading {
                state.loading.insert(session_id.to_string())
            } else {
                state.loading.remove(session_id)
            }
        };
        if changed {
            self.emit(StoreEvent::LoadingChanged {
                session_id: session_id.to_string(),
                loading,
            });
        }
    }

    // Drafts

    pub async fn set_session_input_value(&self, session_id: &str, value: impl Into<String>) {
        {
            let mut state = self.state.write().await;
            state.drafts.entry(session_id.to_string()).or_default().input = value.into();
        }
        self.emit(StoreEvent::DraftChanged {
            session_id: session_id.to_string(),
        });
    }

    pub async fn set_session_attachments(&self, session_id: &str, attachments: Vec<Attachment>) {
        {
            let mut state = self.state.write().await;
            state.drafts.entry(session_id.to_string()).or_default().attachments = attachments;
        }
        self.emit(StoreEvent::DraftChanged {
            session_id: session_id.to_string(),
        });
    }

    pub async fn draft(&self, session_id: &str) -> Draft {
        let state = self.state.read().await;
        state.drafts.get(session_id).cloned().unwrap_or_default()
    }

    pub async fn has_unsent_draft(&self, session_id: &str) -> bool {
        let state = self.state.read().await;
        state.drafts.get(session_id).is_some_and(|d| !d.is_empty())
    }

    /// Clears the draft and hands back what it held
    pub async fn take_draft(&self, session_id: &str) -> Draft {
        let draft = {
            let mut state = self.state.write().await;
            state.drafts.remove(session_id).unwrap_or_default()
        };
        self.emit(StoreEvent::DraftChanged {
            session_id: session_id.to_string(),
        });
        draft
    }

    pub async fn restore_draft(&self, session_id: &str, draft: Draft) {
        {
            let mut state = self.state.write().await;
            state.drafts.insert(session_id.to_string(), draft);
        }
        self.emit(StoreEvent::DraftChanged {
            session_id: session_id.to_string(),
        });
    }

    // Optimistic sends

    /// Shows a user message immediately under a temporary id
    pub async fn begin_optimistic(&self, session_id: &str, content: impl Into<String>) -> String {
        let temp_id = format!("{}{}", TEMP_ID_PREFIX, uuid::Uuid::new_v4());
        let message = ChatMessage::user(temp_id.clone(), content).with_created_at(Utc::now());
        {
            let mut state = self.state.write().await;
            state.pending.insert(
                temp_id.clone(),
                PendingSend {
                    session_id: session_id.to_string(),
                    message,
                    state: PendingState::Optimistic,
                },
            );
        }
        self.emit(StoreEvent::MessagesChanged {
            session_id: session_id.to_string(),
        });
        temp_id
    }

    pub async fn confirm_pending(&self, temp_id: &str, real_id: &str) {
        let session_id = {
            let mut state = self.state.write().await;
            let Some(pending) = state.pending.get_mut(temp_id) else {
                warn!(temp_id = %temp_id, "No pending send to confirm");
                return;
            };
            pending.state = PendingState::Confirmed(real_id.to_string());
            let session_id = pending.session_id.clone();
            state.retire_confirmed(&session_id);
            session_id
        };
        self.emit(StoreEvent::MessagesChanged { session_id });
    }

    /// Drops the optimistic message. Only the last few rolled-back ids are
    /// remembered.
    pub async fn rollback_pending(&self, temp_id: &str) {
        let session_id = {
            let mut state = self.state.write().await;
            let Some(pending) = state.pending.remove(temp_id) else {
                return;
            };
            if state.rolled_back.len() == ROLLED_BACK_HISTORY {
                state.rolled_back.pop_front();
            }
            state
                .rolled_back
                .push_back((pending.session_id.clone(), temp_id.to_string()));
            pending.session_id
        };
        self.emit(StoreEvent::MessagesChanged { session_id });
    }

    pub async fn pending_state(&self, temp_id: &str) -> Option<PendingState> {
        let state = self.state.read().await;
        if let Some(pending) = state.pending.get(temp_id) {
            return Some(pending.state.clone());
        }
        if let Some((_, real)) = state.resolved.get(temp_id) {
            return Some(PendingState::Confirmed(real.clone()));
        }
        state
            .rolled_back
            .iter()
            .any(|(_, id)| id == temp_id)
            .then_some(PendingState::RolledBack)
    }

    /// Maps a temporary id to the server id once known
    pub async fn resolve_message_id(&self, id: &str) -> String {
        let state = self.state.read().await;
        if let Some((_, real)) = state.resolved.get(id) {
            return real.clone();
        }
        match state.pending.get(id).map(|p| &p.state) {
            Some(PendingState::Confirmed(real)) => real.clone(),
            _ => id.to_string(),
        }
    }
}
