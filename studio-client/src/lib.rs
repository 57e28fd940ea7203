//! # Studio Client
//!
//! Headless chat core of the AI studio dashboard: session list, optimistic
//! sends, background-work polling and tool-result folding, driven through a
//! single [`StudioClient`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use studio_client::{ClientConfig, StudioClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = StudioClient::new(ClientConfig::load(None)?)?;
//!     client.store().set_selected_model(Some("gpt-4o".to_string())).await;
//!
//!     let session = client.store().create_session("Moodboard").await?;
//!     let outcome = client
//!         .chat()
//!         .send_message(&session.id, "Three sunset palettes, please", vec![])
//!         .await?;
//!     println!("sent {} ({})", outcome.message_id, outcome.status);
//!     Ok(())
//! }
//! ```

pub mod api_client;
pub mod backend;
pub mod config;
pub mod error;
pub mod local;
pub mod poller;
pub mod reconciler;
pub mod send;
pub mod sse;
pub mod store;

pub use api_client::ApiClient;
pub use backend::{AgentBackend, EventStream, RemoteSessionLoader, SessionLoader};
pub use config::{ClientConfig, PollConfig, SyncMode};
pub use error::ClientError;
pub use local::{is_local_session, LocalSessionLoader};
pub use poller::{PollController, PollStart};
pub use send::{ChatService, SendOutcome};
pub use store::{
    ChatSessionsStore, Draft, LoadOptions, Notification, NotificationLevel, PendingState,
    StoreEvent,
};

use std::sync::Arc;

/// Store, poll controller and chat service sharing one backend
#[derive(Clone)]
pub struct StudioClient {
    store: ChatSessionsStore,
    poller: PollController,
    chat: ChatService,
}

impl StudioClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let poll = config.poll.clone();
        let backend: Arc<dyn AgentBackend> = Arc::new(ApiClient::new(config)?);
        Ok(Self::with_backend(backend, poll))
    }

    pub fn with_backend(backend: Arc<dyn AgentBackend>, poll: PollConfig) -> Self {
        let store = ChatSessionsStore::new(backend.clone()).with_message_limit(poll.message_limit);
        let poller = PollController::new(backend.clone(), store.clone(), poll);
        let chat = ChatService::new(backend, store.clone(), poller.clone());
        Self {
            store,
            poller,
            chat,
        }
    }

    pub fn store(&self) -> &ChatSessionsStore {
        &self.store
    }

    pub fn poller(&self) -> &PollController {
        &self.poller
    }

    pub fn chat(&self) -> &ChatService {
        &self.chat
    }

    /// Stops every background loop
    pub fn shutdown(&self) {
        self.poller.shutdown();
    }
}
