use crate::cli::Context;
use crate::error::CliError;
use crate::output::print_structured;
use studio_client::{LoadOptions, StudioClient};
use tracing::info;

/// Session management commands
#[derive(Debug, clap::Subcommand)]
pub enum SessionCommands {
    /// List sessions
    List,
    /// Create a session
    Create {
        /// Session title
        title: String,
        /// Model the session will use
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Delete a session
    Delete { session_id: String },
}

impl SessionCommands {
    pub async fn execute(&self, context: &Context) -> Result<(), CliError> {
        let client = context.connect()?;
        client.store().load_sessions(LoadOptions::default()).await?;

        match self {
            SessionCommands::List => list_sessions(&client, context).await,
            SessionCommands::Create { title, model } => {
                create_session(&client, context, title, model.clone()).await
            }
            SessionCommands::Delete { session_id } => delete_session(&client, session_id).await,
        }
    }
}

async fn list_sessions(client: &StudioClient, context: &Context) -> Result<(), CliError> {
    let sessions = client.store().sessions().await;
    if print_structured(context.format, &sessions)? {
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No sessions found.");
    } else {
        println!("Sessions:");
        for session in sessions {
            println!(
                "  {} - {} (Status: {}, updated {})",
                session.id,
                if session.title.is_empty() { "Untitled" } else { session.title.as_str() },
                session.status,
                session.updated_at.format("%Y-%m-%d %H:%M")
            );
        }
    }
    Ok(())
}

async fn create_session(
    client: &StudioClient,
    context: &Context,
    title: &str,
    model: Option<String>,
) -> Result<(), CliError> {
    info!("Creating session with title: {}", title);
    client.store().set_selected_model(model).await;

    let session = client.store().create_session(title).await?;
    if !print_structured(context.format, &session)? {
        println!("Created session '{}' with ID: {}", session.title, session.id);
    }
    Ok(())
}

async fn delete_session(client: &StudioClient, session_id: &str) -> Result<(), CliError> {
    info!("Deleting session: {}", session_id);
    client.store().delete_session(session_id).await?;
    println!("Deleted session {}", session_id);
    Ok(())
}
