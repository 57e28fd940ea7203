pub fn generate_typescript_definitions(
    type_names: &[&str],
) -> Result<String, Box<dyn std::error::Error>> {
    if type_names.is_empty() {
        return Err("No type names provided".into());
    }

    let mut definitions = Vec::new();

    for name in type_names {
        let type_def = export_type(name)?;
        let cleaned = clean_type(type_def);

        if !cleaned.trim().is_empty() {
            definitions.push(cleaned);
        }
    }

    Ok(definitions.join("\n\n"))
}

fn export_type(name: &str) -> Result<String, Box<dyn std::error::Error>> {
    use crate::*;
    use ts_rs::TS;

    let result = match name {
        "ChatSession" => ChatSession::export_to_string()?,
        "SessionStatus" => SessionStatus::export_to_string()?,
        "SessionListResponse" => SessionListResponse::export_to_string()?,
        "CreateSessionRequest" => CreateSessionRequest::export_to_string()?,
        "SessionResponse" => SessionResponse::export_to_string()?,

        "ChatMessage" => ChatMessage::export_to_string()?,
        "MessageRole" => MessageRole::export_to_string()?,
        "ToolCall" => ToolCall::export_to_string()?,
        "ToolFunction" => ToolFunction::export_to_string()?,
        "ToolResult" => ToolResult::export_to_string()?,
        "TokenUsage" => TokenUsage::export_to_string()?,
        "MessagesResponse" => MessagesResponse::export_to_string()?,
        "SendMessageRequest" => SendMessageRequest::export_to_string()?,
        "SendMessageResponse" => SendMessageResponse::export_to_string()?,
        "CancelRequest" => CancelRequest::export_to_string()?,
        "ToolResultEntry" => ToolResultEntry::export_to_string()?,
        "ToolResultSubmission" => ToolResultSubmission::export_to_string()?,

        "Attachment" => Attachment::export_to_string()?,
        "AttachmentKind" => AttachmentKind::export_to_string()?,
        "AttachmentSource" => AttachmentSource::export_to_string()?,
        "AttachmentRef" => AttachmentRef::export_to_string()?,
        "ContentPart" => ContentPart::export_to_string()?,

        "AgentEvent" => AgentEvent::export_to_string()?,
        "GenerationType" => GenerationType::export_to_string()?,
        "TaskSubmission" => TaskSubmission::export_to_string()?,
        "ExportedCookie" => ExportedCookie::export_to_string()?,
        "AuthCookiesResponse" => AuthCookiesResponse::export_to_string()?,

        "ErrorResponse" => ErrorResponse::export_to_string()?,

        _ => {
            return Err(format!(
                "Unknown type: '{}'. Available types can be found in shared-types/src/",
                name
            )
            .into());
        }
    };

    Ok(result)
}

fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');

    let lines: Vec<&str> = type_def.lines().collect();

    let filtered: Vec<&str> = lines
        .iter()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("import type")
                && !trimmed.starts_with("// This file was generated")
        })
        .cloned()
        .collect();

    filtered.join("\n").trim().to_string()
}
