use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Represents a chat-completions model identifier.
///
/// This can be one of the models the client knows about or a custom string
/// for models hosted after this list was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    /// Known model identifiers
    Known(KnownModel),

    /// Custom model identifier
    Custom(String),
}

/// Models hosted on Groq's OpenAI-compatible endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownModel {
    /// Llama 3 70B with an 8k context window.
    Llama3_70b8192,

    /// Llama 3 8B with an 8k context window.
    Llama3_8b8192,

    /// Llama 3.1 8B instant.
    Llama31_8bInstant,

    /// Llama 3.3 70B versatile.
    Llama33_70bVersatile,

    /// Gemma 2 9B instruction tuned.
    Gemma2_9bIt,

    /// Mixtral 8x7B with a 32k context window.
    Mixtral8x7b32768,
}

impl KnownModel {
    /// All known models, in display order.
    pub const ALL: [KnownModel; 6] = [
        KnownModel::Llama3_70b8192,
        KnownModel::Llama3_8b8192,
        KnownModel::Llama31_8bInstant,
        KnownModel::Llama33_70bVersatile,
        KnownModel::Gemma2_9bIt,
        KnownModel::Mixtral8x7b32768,
    ];

    /// The identifier sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::Llama3_70b8192 => "llama3-70b-8192",
            KnownModel::Llama3_8b8192 => "llama3-8b-8192",
            KnownModel::Llama31_8bInstant => "llama-3.1-8b-instant",
            KnownModel::Llama33_70bVersatile => "llama-3.3-70b-versatile",
            KnownModel::Gemma2_9bIt => "gemma2-9b-it",
            KnownModel::Mixtral8x7b32768 => "mixtral-8x7b-32768",
        }
    }
}

impl Model {
    /// The identifier sent on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            Model::Known(known) => known.as_str(),
            Model::Custom(custom) => custom,
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(KnownModel::ALL
            .iter()
            .find(|known| known.as_str() == s)
            .map(|known| Model::Known(*known))
            .unwrap_or_else(|| Model::Custom(s.to_string())))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        match model.parse() {
            Ok(model) => model,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        Model::from(model.to_string())
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Model::from(s))
    }
}
