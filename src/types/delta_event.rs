use crate::types::ChatCompletionChunk;

/// One decoded step of a streamed reply.
///
/// A fragment means more text follows; `None` ends the turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaEvent {
    /// Text to append to the reply, if any.
    pub fragment: Option<String>,
}

impl DeltaEvent {
    /// A delta carrying more text.
    pub fn fragment(text: impl Into<String>) -> Self {
        Self {
            fragment: Some(text.into()),
        }
    }

    /// The end of the turn.
    pub fn end_of_turn() -> Self {
        Self { fragment: None }
    }

    /// Returns true if this event ends the turn.
    pub fn is_end_of_turn(&self) -> bool {
        self.fragment.is_none()
    }

    /// Convert a decoded chunk into an event.
    ///
    /// Returns `None` for a chunk without choices, which carries nothing to apply.
    pub fn from_chunk(chunk: ChatCompletionChunk) -> Option<Self> {
        let choice = chunk.choices.into_iter().next()?;
        Some(Self {
            fragment: choice.delta.content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_chunk() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"hi"}}]}"#).unwrap();
        assert_eq!(DeltaEvent::from_chunk(chunk), Some(DeltaEvent::fragment("hi")));

        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{}}]}"#).unwrap();
        let event = DeltaEvent::from_chunk(chunk).unwrap();
        assert!(event.is_end_of_turn());

        let chunk: ChatCompletionChunk = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(DeltaEvent::from_chunk(chunk), None);
    }
}
