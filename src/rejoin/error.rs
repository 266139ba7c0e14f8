//! Error types for the rejoin tracker
//!
//! This module defines the errors that can occur while tracking, persisting
//! and enforcing rejoin counts.

use thiserror::Error;

/// Errors that can occur in the rejoin tracker
#[derive(Debug, Error)]
pub enum WardenError {
    /// Reading or writing the counter file failed
    #[error("Counter storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The counter file could not be encoded or decoded
    #[error("Counter storage format error: {0}")]
    Json(#[from] serde_json::Error),

    /// Discord API error
    #[error("Discord API error: {0}")]
    DiscordApi(#[from] Box<poise::serenity_prelude::Error>),

    /// Webhook delivery failed
    #[error("Webhook error: {0}")]
    Webhook(#[from] reqwest::Error),

    /// A configuration value is missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to get guild, member or role
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<poise::serenity_prelude::Error> for WardenError {
    fn from(error: poise::serenity_prelude::Error) -> Self {
        Self::DiscordApi(Box::new(error))
    }
}

/// Result type for rejoin tracker operations
pub type WardenResult<T> = Result<T, WardenError>;
