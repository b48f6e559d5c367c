use serde::{Deserialize, Serialize};

use crate::types::{Model, Role};

/// One message of the conversation context sent with a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    /// Who wrote the message.
    pub role: Role,
    /// The message text.
    pub content: String,
}

impl RequestMessage {
    /// Create a new `RequestMessage`.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Body of a `POST chat/completions` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// The conversation context, oldest first.
    pub messages: Vec<RequestMessage>,
    /// The model that should answer.
    pub model: Model,
    /// Whether the response is delivered as a stream of deltas.
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// Create a request that streams its reply.
    pub fn streaming(model: Model, messages: Vec<RequestMessage>) -> Self {
        Self {
            messages,
            model,
            stream: true,
        }
    }

    /// Create a request that returns its reply in one response body.
    pub fn non_streaming(model: Model, messages: Vec<RequestMessage>) -> Self {
        Self {
            messages,
            model,
            stream: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;
    use serde_json::{json, to_value};

    #[test]
    fn streaming_request_serialization() {
        let request = ChatCompletionRequest::streaming(
            Model::Known(KnownModel::Llama3_70b8192),
            vec![RequestMessage::user("Hello")],
        );
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "messages": [{"role": "user", "content": "Hello"}],
                "model": "llama3-70b-8192",
                "stream": true
            })
        );
    }

    #[test]
    fn non_streaming_request_serialization() {
        let request = ChatCompletionRequest::non_streaming(
            Model::Known(KnownModel::Llama31_8bInstant),
            vec![
                RequestMessage::user("Hi"),
                RequestMessage::assistant("Hello!"),
                RequestMessage::user("How are you?"),
            ],
        );
        let json = to_value(&request).unwrap();
        assert_eq!(json["model"], "llama-3.1-8b-instant");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][1]["role"], "assistant");
        assert_eq!(json["messages"][2]["content"], "How are you?");
    }
}
