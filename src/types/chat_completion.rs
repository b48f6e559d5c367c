use serde::{Deserialize, Serialize};

/// Body of a non-streaming chat-completions response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// Completion identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The model that produced the completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Generated choices; the client reads the first.
    pub choices: Vec<CompletionChoice>,
}

/// A complete choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionChoice {
    /// The generated message.
    pub message: CompletionMessage,

    /// Why generation stopped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// The generated message of a complete choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionMessage {
    /// The reply text.
    pub content: String,
}

impl ChatCompletion {
    /// The text of the first choice, if the server returned any.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .map(|choice| choice.message.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_deserialization() {
        let completion: ChatCompletion = serde_json::from_str(
            r#"{
                "id": "chatcmpl-7",
                "object": "chat.completion",
                "model": "llama-3.1-8b-instant",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hello there"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 3, "completion_tokens": 2}
            }"#,
        )
        .unwrap();
        assert_eq!(completion.text(), Some("Hello there"));
        assert_eq!(completion.model.as_deref(), Some("llama-3.1-8b-instant"));
    }

    #[test]
    fn completion_without_choices() {
        let completion: ChatCompletion = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(completion.text(), None);
    }
}
