pub mod commands;
pub mod config;
pub mod data;
pub mod handlers;
pub mod health;
pub mod logging;
pub mod rejoin;

pub const BOT_NAME: &str = "rejoin_warden";
pub const COMMAND_TARGET: &str = "rejoin_warden::command";
pub const ERROR_TARGET: &str = "rejoin_warden::error";
pub const EVENT_TARGET: &str = "rejoin_warden::handlers";
pub const CONSOLE_TARGET: &str = "rejoin_warden";

pub use config::Config;
pub use data::{Data, DataInner};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
