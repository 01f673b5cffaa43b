//! Interactive console for the developer assistant.
//!
//! This module provides a line-oriented REPL built on top of the session,
//! settings, directory and attachment state holders. It supports:
//!
//! - Streaming responses rendered event by event
//! - Slash commands for sessions, settings, directory browsing and files
//! - Configuration from flags and an optional YAML profile
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: The console session that dispatches commands
//! - [`commands`]: Slash command parsing

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, ChatProfile};
pub use session::{ChatSession, CommandOutcome};
