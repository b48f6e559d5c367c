// Public modules
pub mod chat;
pub mod client;
pub mod clipboard;
pub mod credentials;
pub mod error;
pub mod sse;
pub mod store;
pub mod types;

mod observability;

// Re-exports
pub use client::{CompletionTransport, DEFAULT_API_URL, DeltaStream, Groq};
pub use clipboard::{Clipboard, MemoryClipboard, TerminalClipboard};
pub use credentials::{
    API_KEY_STORAGE_KEY, CredentialProvider, FileCredentials, MemoryCredentials,
    PLACEHOLDER_API_KEY,
};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use sse::{DeltaDecoder, decode_deltas, decode_line};
pub use store::MessageStore;
pub use types::*;
