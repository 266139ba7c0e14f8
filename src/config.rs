//! Runtime configuration read from the environment

use crate::rejoin::{WardenError, WardenResult};
use poise::serenity_prelude::RoleId;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_PATH: &str = "data/rejoin_counts.json";
pub const DEFAULT_PREFIX: &str = "!";

/// Bot configuration
#[derive(Clone)]
pub struct Config {
    pub token: String,
    pub blacklist_role_id: Option<RoleId>,
    pub kick_enabled: bool,
    pub webhook_url: Option<String>,
    /// Port of the liveness endpoint
    pub port: u16,
    pub data_path: PathBuf,
    /// Invite link shown in warning and blacklist messages
    pub invite_url: Option<String>,
    pub command_prefix: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("blacklist_role_id", &self.blacklist_role_id)
            .field("kick_enabled", &self.kick_enabled)
            .field("webhook_url", &self.webhook_url.as_ref().map(|_| "<set>"))
            .field("port", &self.port)
            .field("data_path", &self.data_path)
            .field("invite_url", &self.invite_url)
            .field("command_prefix", &self.command_prefix)
            .finish()
    }
}

impl Config {
    /// Read the process environment
    ///
    /// `.env` is loaded by the binary before this is called.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::Config`] if the token is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> WardenResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> WardenResult<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let token = var("DISCORD_TOKEN")
            .or_else(|| var("BOT_TOKEN"))
            .ok_or_else(|| WardenError::Config("DISCORD_TOKEN must be set".to_string()))?;

        let blacklist_role_id = var("BLACKLIST_ROLE_ID")
            .map(|raw| {
                raw.parse::<u64>()
                    .ok()
                    .filter(|id| *id != 0)
                    .map(RoleId::new)
                    .ok_or_else(|| {
                        WardenError::Config(format!("BLACKLIST_ROLE_ID is not a role ID: {raw}"))
                    })
            })
            .transpose()?;

        let port = var("PORT")
            .map(|raw| {
                raw.parse::<u16>()
                    .map_err(|_| WardenError::Config(format!("PORT is not a port number: {raw}")))
            })
            .transpose()?
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            token,
            blacklist_role_id,
            kick_enabled: var("KICK_ENABLED").is_some_and(|value| parse_bool(&value)),
            webhook_url: var("WEBHOOK_URL"),
            port,
            data_path: var("REJOIN_DATA_PATH").map_or_else(|| DEFAULT_DATA_PATH.into(), PathBuf::from),
            invite_url: var("SERVER_INVITE_URL"),
            command_prefix: var("COMMAND_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
        })
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
