//! Wire and domain types.

mod chat_completion;
mod chat_completion_chunk;
mod chat_completion_request;
mod chat_message;
mod delta_event;
mod model;
mod role;

pub use chat_completion::{ChatCompletion, CompletionChoice, CompletionMessage};
pub use chat_completion_chunk::{ChatCompletionChunk, ChoiceDelta, ChunkChoice};
pub use chat_completion_request::{ChatCompletionRequest, RequestMessage};
pub use chat_message::{ChatMessage, Completion, MessageId};
pub use delta_event::DeltaEvent;
pub use model::{KnownModel, Model};
pub use role::Role;
