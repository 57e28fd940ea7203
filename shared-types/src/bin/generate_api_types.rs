use shared_types::generate_typescript_definitions;
use std::fs;
use std::path::Path;

const API_TYPES: &[&str] = &[
    "SessionStatus",
    "ChatSession",
    "SessionListResponse",
    "CreateSessionRequest",
    "SessionResponse",
    "MessageRole",
    "ToolFunction",
    "ToolCall",
    "ToolResult",
    "TokenUsage",
    "ChatMessage",
    "MessagesResponse",
    "SendMessageRequest",
    "SendMessageResponse",
    "CancelRequest",
    "ToolResultEntry",
    "ToolResultSubmission",
    "AttachmentKind",
    "AttachmentSource",
    "Attachment",
    "AttachmentRef",
    "ContentPart",
    "AgentEvent",
    "GenerationType",
    "TaskSubmission",
    "ExportedCookie",
    "AuthCookiesResponse",
    "ErrorResponse",
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = generate_typescript_definitions(API_TYPES)?;

    let output_dir = Path::new("web/api-types");
    fs::create_dir_all(output_dir)?;

    let output_path = output_dir.join("types.ts");
    fs::write(&output_path, format!("{}\n", output))?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}
