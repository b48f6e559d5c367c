//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction that allows
//! for different output styles, and [`ReplyFollower`], which turns store
//! snapshots into the text a renderer has not printed yet.

use std::collections::HashSet;
use std::io::{self, Stdout, Write};

use crate::types::{ChatMessage, MessageId};

/// ANSI escape code for dim text (used for message numbers).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the bot label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the user label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors and failed replies).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Capturing output in tests
pub trait Renderer: Send {
    /// Called before the first fragment of a reply.
    fn start_response(&mut self);

    /// Print a chunk of reply text.
    ///
    /// This is called incrementally as fragments are applied to the store.
    fn print_text(&mut self, text: &str);

    /// Print one message of the conversation at position `index`.
    fn print_message(&mut self, index: usize, message: &ChatMessage);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a reply is complete.
    ///
    /// Used to ensure proper newlines and cleanup after streaming.
    fn finish_response(&mut self);

    /// Called when the stream is interrupted by the user.
    fn print_interrupted(&mut self);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    /// The line `print_message` writes for `message`.
    pub fn format_message(&self, index: usize, message: &ChatMessage) -> String {
        let number = self.paint(ANSI_DIM, &format!("[{index}]"));
        let label = if message.is_user {
            self.paint(ANSI_GREEN, "You:")
        } else {
            self.paint(ANSI_CYAN, "Groq:")
        };
        let status = if message.is_failed() {
            format!(" {}", self.paint(ANSI_RED, "(failed)"))
        } else if message.is_in_flight() {
            format!(" {}", self.paint(ANSI_DIM, "(streaming)"))
        } else {
            String::new()
        };
        let time = message
            .timestamp
            .format(&time::macros::format_description!("[hour]:[minute]"))
            .unwrap_or_default();
        format!("{number} {time} {label} {}{status}", message.text)
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_response(&mut self) {
        let label = self.paint(ANSI_CYAN, "Groq:");
        print!("{label} ");
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        print!("{text}");
        self.flush();
    }

    fn print_message(&mut self, index: usize, message: &ChatMessage) {
        println!("{}", self.format_message(index, message));
    }

    fn print_error(&mut self, error: &str) {
        eprintln!("\n{}", self.paint(ANSI_RED, &format!("Error: {error}")));
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
    }

    fn finish_response(&mut self) {
        println!();
        self.flush();
    }

    fn print_interrupted(&mut self) {
        println!("\n[interrupted]");
        self.flush();
    }
}

/// Tracks how much of a turn's reply has been printed.
///
/// Built from the messages that exist before the turn starts. Each later
/// snapshot is scanned for the first bot message outside that baseline,
/// whether it is still streaming or already settled, and the text appended
/// since the last call is returned.
#[derive(Debug)]
pub struct ReplyFollower {
    baseline: HashSet<MessageId>,
    reply: Option<MessageId>,
    printed: usize,
    settled: bool,
}

impl ReplyFollower {
    /// Creates a follower that ignores every message in `existing`.
    pub fn new(existing: &[ChatMessage]) -> Self {
        Self {
            baseline: existing.iter().map(|m| m.id).collect(),
            reply: None,
            printed: 0,
            settled: false,
        }
    }

    /// The reply being followed, once one has appeared.
    pub fn reply(&self) -> Option<MessageId> {
        self.reply
    }

    /// Returns true once the followed reply is complete, failed, or gone.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Returns the unprinted suffix of the followed reply, if any.
    pub fn advance(&mut self, messages: &[ChatMessage]) -> Option<String> {
        if self.reply.is_none() {
            let fresh = messages
                .iter()
                .find(|m| !m.is_user && !self.baseline.contains(&m.id))?;
            self.reply = Some(fresh.id);
            self.printed = 0;
        }
        let id = self.reply?;
        let Some(message) = messages.iter().find(|m| m.id == id) else {
            self.settled = true;
            return None;
        };
        self.settled = !message.is_in_flight();
        let fresh = message.text.get(self.printed..).unwrap_or_default();
        if fresh.is_empty() {
            return None;
        }
        self.printed = message.text.len();
        Some(fresh.to_string())
    }
}
