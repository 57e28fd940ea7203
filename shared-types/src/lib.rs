use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub mod auth;
pub mod content;
pub mod events;
pub mod generation;
pub mod message;
pub mod session;
pub mod typescript_gen;

pub use typescript_gen::generate_typescript_definitions;

pub use auth::{AuthCookiesResponse, ExportedCookie};
pub use content::{
    Attachment, AttachmentKind, AttachmentRef, AttachmentSource, ContentPart, MessageContent,
};
pub use events::AgentEvent;
pub use generation::{GenerationType, TaskSubmission};
pub use message::{
    CancelRequest, ChatMessage, MessageRole, MessagesResponse, SendMessageRequest,
    SendMessageResponse, TokenUsage, ToolCall, ToolFunction, ToolResult, ToolResultEntry,
    ToolResultSubmission,
};
pub use session::{
    ChatSession, CreateSessionRequest, SessionListResponse, SessionResponse, SessionStatus,
};

// Shared models for the studio client, API service and web dashboard

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}
