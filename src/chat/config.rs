//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior. A YAML file may supply the same
//! settings; command-line arguments win over the file.

use std::fs;
use std::path::Path;
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{KnownModel, Model};

/// The greeting a new conversation starts with.
pub const DEFAULT_GREETING: &str = "Hello! Welcome to Groq Chat. How can I help you today?";

/// Command-line arguments for the quickgroq-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for streamed replies.
    #[arrrg(optional, "Model for streamed replies (default: llama3-70b-8192)", "MODEL")]
    pub model: Option<String>,

    /// Model to use for whole replies.
    #[arrrg(
        optional,
        "Model for non-streamed replies (default: llama-3.1-8b-instant)",
        "MODEL"
    )]
    pub completion_model: Option<String>,

    /// Override the API base URL.
    #[arrrg(optional, "API base URL (default: https://api.groq.com/openai/v1/)", "URL")]
    pub base_url: Option<String>,

    /// YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "PATH")]
    pub config: Option<String>,

    /// YAML credentials file.
    #[arrrg(optional, "YAML credentials file", "PATH")]
    pub credentials: Option<String>,

    /// Wait for whole replies instead of streaming.
    #[arrrg(flag, "Wait for whole replies instead of streaming")]
    pub no_stream: bool,

    /// Send the whole conversation with each request.
    #[arrrg(flag, "Send the whole conversation with each request")]
    pub full_history: bool,

    /// Start without the greeting message.
    #[arrrg(flag, "Start without the greeting message")]
    pub no_greeting: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Log debug output to stderr.
    #[arrrg(flag, "Log debug output to stderr")]
    pub verbose: bool,
}

/// How much of the conversation accompanies each request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    /// Only the message being answered.
    #[default]
    LatestMessage,
    /// Every earlier user message and completed reply, then the message.
    FullHistory,
}

impl std::str::FromStr for ContextMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "latest" | "latest_message" => Ok(ContextMode::LatestMessage),
            "full" | "full_history" => Ok(ContextMode::FullHistory),
            _ => Err(Error::validation(
                format!("unknown context mode {s:?}; expected latest or full"),
                Some("context".to_string()),
            )),
        }
    }
}

impl std::fmt::Display for ContextMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextMode::LatestMessage => write!(f, "latest"),
            ContextMode::FullHistory => write!(f, "full"),
        }
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// the configuration file and command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// The model used for streamed replies.
    pub model: Model,

    /// The model used for whole replies.
    pub completion_model: Model,

    /// The bot message a new conversation starts with, if any.
    pub greeting: Option<String>,

    /// Whether plain sends stream.
    pub stream: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// API base URL; `None` uses Groq's.
    pub base_url: Option<String>,

    /// Request timeout in seconds; `None` uses the client default.
    pub timeout_secs: Option<u64>,

    /// How much history is sent with each request.
    pub context: ContextMode,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: llama3-70b-8192
    /// - Completion model: llama-3.1-8b-instant
    /// - Greeting: enabled
    /// - Streaming: enabled
    /// - Color: enabled
    /// - Context: latest message only
    pub fn new() -> Self {
        Self {
            model: Model::Known(KnownModel::Llama3_70b8192),
            completion_model: Model::Known(KnownModel::Llama31_8bInstant),
            greeting: Some(DEFAULT_GREETING.to_string()),
            stream: true,
            use_color: true,
            base_url: None,
            timeout_secs: None,
            context: ContextMode::LatestMessage,
        }
    }

    /// Reads a configuration from a YAML file. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        Self::from_yaml(&content)
    }

    /// Parses a configuration from YAML text. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not a valid configuration.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Loads the file named by `args.config`, if any, then applies `args`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded.
    pub fn load(args: &ChatArgs) -> Result<Self> {
        let config = match &args.config {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::new(),
        };
        Ok(config.apply_args(args))
    }

    /// Overrides settings with those given on the command line.
    pub fn apply_args(mut self, args: &ChatArgs) -> Self {
        if let Some(model) = &args.model {
            self.model = parse_model(model);
        }
        if let Some(model) = &args.completion_model {
            self.completion_model = parse_model(model);
        }
        if let Some(base_url) = &args.base_url {
            self.base_url = Some(base_url.clone());
        }
        if args.no_stream {
            self.stream = false;
        }
        if args.full_history {
            self.context = ContextMode::FullHistory;
        }
        if args.no_greeting {
            self.greeting = None;
        }
        if args.no_color {
            self.use_color = false;
        }
        self
    }

    /// The request timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Sets the streaming model.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the non-streaming model.
    pub fn with_completion_model(mut self, model: Model) -> Self {
        self.completion_model = model;
        self
    }

    /// Sets the greeting.
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    /// Starts conversations empty.
    pub fn without_greeting(mut self) -> Self {
        self.greeting = None;
        self
    }

    /// Sets whether plain sends stream.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Sets the context mode.
    pub fn with_context(mut self, context: ContextMode) -> Self {
        self.context = context;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig::new().apply_args(&args)
    }
}

fn parse_model(s: &str) -> Model {
    Model::from(s)
}
