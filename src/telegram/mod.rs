//! Telegram bot integration: bot setup, dispatcher schema, message
//! formatting, and the `MediaSink` implementation.

pub mod bot;
pub mod handlers;
pub mod markup;
pub mod sink;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, Orchestrator};
pub use sink::TelegramSink;
