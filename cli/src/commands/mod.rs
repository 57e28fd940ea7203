//! Command implementations for the studio CLI

pub mod chat;
pub mod form;
pub mod sessions;

pub use chat::ChatCommands;
pub use form::FormCommands;
pub use sessions::SessionCommands;
