use crate::cli::Context;
use crate::error::CliError;
use crate::output::{print_structured, OutputFormat};
use shared_types::{Attachment, AttachmentSource, ChatMessage, MessageContent, MessageRole, SessionStatus};
use std::collections::HashSet;
use studio_client::store::TEMP_ID_PREFIX;
use studio_client::{LoadOptions, NotificationLevel, StoreEvent, StudioClient};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Chat commands
#[derive(Debug, clap::Subcommand)]
pub enum ChatCommands {
    /// Send a message and follow the agent's reply
    Send {
        session_id: String,
        message: String,
        /// Model to answer with
        #[arg(short, long)]
        model: Option<String>,
        /// Storage key of an uploaded image (repeatable)
        #[arg(long)]
        image: Vec<String>,
        /// Storage key of an uploaded file (repeatable)
        #[arg(long)]
        file: Vec<String>,
        /// Return as soon as the message is accepted
        #[arg(long)]
        no_wait: bool,
    },
    /// Follow a session until the agent is done
    Watch { session_id: String },
    /// Cancel the agent's current run
    Cancel { session_id: String },
    /// Print a session's messages
    History { session_id: String },
}

impl ChatCommands {
    pub async fn execute(&self, context: &Context) -> Result<(), CliError> {
        let client = context.connect()?;
        let session_id = match self {
            ChatCommands::Send { session_id, .. }
            | ChatCommands::Watch { session_id }
            | ChatCommands::Cancel { session_id }
            | ChatCommands::History { session_id } => session_id,
        };
        client
            .store()
            .load_sessions(LoadOptions {
                external_session_id: Some(session_id.clone()),
                ..Default::default()
            })
            .await?;

        let result = match self {
            ChatCommands::Send {
                message,
                model,
                image,
                file,
                no_wait,
                ..
            } => {
                let attachments = attachments(image, file);
                send(&client, context, session_id, message, model.clone(), attachments, *no_wait).await
            }
            ChatCommands::Watch { .. } => watch(&client, context.format, session_id).await,
            ChatCommands::Cancel { .. } => {
                let status = client.chat().cancel(session_id).await?;
                println!("Session {} is {}", session_id, status);
                Ok(())
            }
            ChatCommands::History { .. } => {
                let messages = client.store().messages(session_id).await;
                if !print_structured(context.format, &messages)? {
                    for message in &messages {
                        print_message(message);
                    }
                }
                Ok(())
            }
        };
        client.shutdown();
        result
    }
}

fn attachments(images: &[String], files: &[String]) -> Vec<Attachment> {
    let images = images
        .iter()
        .map(|key| Attachment::image(AttachmentSource::Key(key.clone())));
    let files = files.iter().map(|key| {
        let name = key.rsplit('/').next().unwrap_or(key);
        Attachment::file(AttachmentSource::Key(key.clone()), name)
    });
    images.chain(files).collect()
}

async fn send(
    client: &StudioClient,
    context: &Context,
    session_id: &str,
    message: &str,
    model: Option<String>,
    attachments: Vec<Attachment>,
    no_wait: bool,
) -> Result<(), CliError> {
    client.store().set_selected_model(model).await;

    // Subscribe before sending so no update between send and watch is missed
    let events = client.store().subscribe();
    let outcome = client.chat().send_message(session_id, message, attachments).await?;
    info!(
        session_id = %session_id,
        message_id = %outcome.message_id,
        status = %outcome.status,
        "Message accepted"
    );

    if no_wait || !outcome.status.is_active() {
        if !print_structured(context.format, &client.store().messages(session_id).await)? {
            println!("Sent {} (session is {})", outcome.message_id, outcome.status);
        }
        return Ok(());
    }
    follow(client, context.format, session_id, events).await
}

async fn watch(client: &StudioClient, format: OutputFormat, session_id: &str) -> Result<(), CliError> {
    let events = client.store().subscribe();
    let status = client.chat().open_session(session_id).await?;
    if status.is_active() {
        follow(client, format, session_id, events).await
    } else {
        let messages = client.store().messages(session_id).await;
        if !print_structured(format, &messages)? {
            messages.iter().for_each(print_message);
            println!("Session {} is {}", session_id, status);
        }
        Ok(())
    }
}

/// Prints messages as they arrive until the session stops loading
async fn follow(
    client: &StudioClient,
    format: OutputFormat,
    session_id: &str,
    mut events: tokio::sync::broadcast::Receiver<StoreEvent>,
) -> Result<(), CliError> {
    let text = format == OutputFormat::Text;
    let mut printed = HashSet::new();
    let mut status = SessionStatus::Processing;

    if text {
        print_new(client, session_id, &mut printed).await;
    }

    loop {
        match events.recv().await {
            Ok(StoreEvent::MessagesChanged { session_id: id }) if id == session_id && text => {
                print_new(client, session_id, &mut printed).await;
            }
            Ok(StoreEvent::StatusChanged { session_id: id, status: new }) if id == session_id => {
                status = new;
            }
            Ok(StoreEvent::LoadingChanged {
                session_id: id,
                loading: false,
            }) if id == session_id => break,
            Ok(StoreEvent::Notification(notification))
                if notification.level == NotificationLevel::Error =>
            {
                eprintln!("{}", notification.message);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Fell behind on session updates");
            }
            Err(RecvError::Closed) => break,
        }
    }

    let messages = client.store().messages(session_id).await;
    if !print_structured(format, &messages)? {
        print_new(client, session_id, &mut printed).await;
        println!("Session {} is {}", session_id, status);
    }
    if status == SessionStatus::Failed {
        return Err(CliError::Command(format!("Agent run in session {} failed", session_id)));
    }
    Ok(())
}

async fn print_new(client: &StudioClient, session_id: &str, printed: &mut HashSet<String>) {
    for message in client.store().messages(session_id).await {
        // Optimistic copies are printed once confirmed
        if message.id.starts_with(TEMP_ID_PREFIX) {
            continue;
        }
        if printed.insert(message.id.clone()) {
            print_message(&message);
        }
    }
}

fn print_message(message: &ChatMessage) {
    let role = match message.role {
        MessageRole::User => "you",
        MessageRole::Assistant => "agent",
        MessageRole::Tool => "tool",
    };
    let content = MessageContent::parse(&message.content);
    let attachments = content.attachment_count();
    let mut line = format!("[{}] {}: {}", message.created_at.format("%H:%M:%S"), role, content.text());
    if attachments > 0 {
        line.push_str(&format!(" ({} attachment(s))", attachments));
    }
    println!("{}", line);

    for call in message.tool_calls.iter().flatten() {
        println!("    -> {}({})", call.name(), call.function.arguments);
    }
    for result in message.tool_results.iter().flatten() {
        let outcome = if result.success { "ok" } else { "failed" };
        println!("    <- {} {}", result.tool_name, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::AttachmentKind;

    #[test]
    fn test_attachments_from_keys() {
        let built = attachments(
            &["uploads/a.png".to_string()],
            &["docs/brief.pdf".to_string()],
        );
        assert_eq!(built.len(), 2);
        assert_eq!(built[0].kind, AttachmentKind::Image);
        assert_eq!(built[1].kind, AttachmentKind::File);
        assert_eq!(built[1].name.as_deref(), Some("brief.pdf"));
    }
}
