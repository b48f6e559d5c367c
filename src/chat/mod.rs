//! Chat application module for interactive conversations with Groq models.
//!
//! This module provides the streaming session manager and the pieces of the
//! REPL built on top of it. It supports:
//!
//! - Streaming replies applied fragment by fragment to a shared store
//! - Whole (non-streamed) replies
//! - Regenerating, deleting and copying earlier turns
//! - Slash commands for session control
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Core chat session management and API interaction
//! - [`commands`]: Slash command parsing
//! - [`render`]: Terminal output

pub mod commands;
pub mod config;
pub mod render;
pub mod session;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, ContextMode, DEFAULT_GREETING};
pub use render::{PlainTextRenderer, Renderer, ReplyFollower};
pub use session::ChatSession;
