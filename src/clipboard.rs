//! Clipboard sinks for copied messages.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use base64::Engine;

use crate::{Error, Result};

/// Somewhere to put copied message text.
pub trait Clipboard: Send + Sync {
    /// Replace the clipboard contents with `text`.
    fn set_text(&self, text: &str) -> Result<()>;
}

/// A clipboard that keeps the last copied text in memory.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    /// Create an empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last copied text.
    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn set_text(&self, text: &str) -> Result<()> {
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = Some(text.to_string());
        Ok(())
    }
}

/// Copies through the terminal with an OSC 52 escape sequence.
///
/// Most modern terminal emulators forward the payload to the system clipboard,
/// including over SSH.
#[derive(Debug, Default)]
pub struct TerminalClipboard;

impl TerminalClipboard {
    /// The escape sequence that sets the clipboard to `text`.
    pub fn escape_sequence(text: &str) -> String {
        let payload = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
        format!("\x1b]52;c;{payload}\x07")
    }
}

impl Clipboard for TerminalClipboard {
    fn set_text(&self, text: &str) -> Result<()> {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(Self::escape_sequence(text).as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|err| Error::io("failed to write clipboard sequence", err))
    }
}
