use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{ChatCommands, FormCommands, SessionCommands};
use crate::error::CliError;
use crate::output::OutputFormat;
use studio_client::{ClientConfig, StudioClient};

#[derive(Debug, Parser)]
#[command(name = "studio")]
#[command(about = "Command-line client for AI studio chat sessions and generation forms")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Client configuration file (defaults to the per-user config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List, create and delete chat sessions
    Sessions {
        #[command(subcommand)]
        action: SessionCommands,
    },

    /// Talk to the agent in a session
    Chat {
        #[command(subcommand)]
        action: ChatCommands,
    },

    /// Work with generation parameter schemas
    Form {
        #[command(subcommand)]
        action: FormCommands,
    },

    /// Show version information
    Version,
}

/// What commands need from the global flags
pub struct Context {
    pub config: Option<PathBuf>,
    pub format: OutputFormat,
}

impl Context {
    pub fn connect(&self) -> Result<StudioClient, CliError> {
        let config = ClientConfig::load(self.config.as_deref())?;
        tracing::debug!(base_url = %config.base_url, "Connecting to studio backend");
        Ok(StudioClient::new(config)?)
    }
}

impl Cli {
    pub async fn run(&self) -> Result<(), CliError> {
        let context = Context {
            config: self.config.clone(),
            format: self.format,
        };

        match &self.command {
            Some(Commands::Sessions { action }) => action.execute(&context).await,
            Some(Commands::Chat { action }) => action.execute(&context).await,
            Some(Commands::Form { action }) => action.execute(&context),
            Some(Commands::Version) => self.handle_version(),
            None => {
                println!("studio CLI - chat sessions and generation forms for AI studio");
                println!("Run 'studio --help' for usage information.");
                Ok(())
            }
        }
    }

    fn handle_version(&self) -> Result<(), CliError> {
        println!("studio CLI version: {}", env!("CARGO_PKG_VERSION"));
        println!("Author: {}", env!("CARGO_PKG_AUTHORS"));
        println!("Description: {}", env!("CARGO_PKG_DESCRIPTION"));
        Ok(())
    }
}
