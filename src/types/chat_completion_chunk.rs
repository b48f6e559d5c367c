use serde::{Deserialize, Serialize};

/// One decoded line of a streaming chat-completions response.
///
/// Only the fields the client consumes are required. Everything else the
/// server adds (ids, usage, provider extensions) is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// Chunk identifier, shared by every chunk of one completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The model that produced the chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Incremental choices; the client reads the first.
    pub choices: Vec<ChunkChoice>,
}

/// A streamed choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// The text added by this chunk.
    pub delta: ChoiceDelta,

    /// Why generation stopped, on the final chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// The incremental content of a streamed choice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoiceDelta {
    /// Text fragment. `None` (null or missing) marks the end of the turn.
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// The fragment carried by the first choice.
    ///
    /// Returns `None` when the chunk has no choices at all, `Some(None)` when the
    /// first choice carries no content.
    pub fn first_content(&self) -> Option<Option<&str>> {
        self.choices
            .first()
            .map(|choice| choice.delta.content.as_deref())
    }
}
