//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the API. Message numbers are the positions printed by `/history`.

use crate::chat::config::ContextMode;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation.
    Reset,

    /// Print the conversation with message numbers.
    History,

    /// Regenerate a bot reply; `None` means the last one.
    Regenerate(Option<usize>),

    /// Delete a bot reply and the message before it.
    Delete(usize),

    /// Copy a message to the clipboard.
    Copy(usize),

    /// Change the streaming model.
    Model(String),

    /// Change the model used when streaming is off.
    CompletionModel(String),

    /// Print the active configuration.
    Config,

    /// Turn streaming on or off.
    Stream(bool),

    /// Store a new API key.
    Key(String),

    /// Change how much history accompanies each request.
    Context(ContextMode),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use quickgroq::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/model llama3-70b-8192").is_some());
/// assert!(parse_command("Hello, Groq!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "reset" | "clear" => ChatCommand::Reset,
        "history" | "h" => ChatCommand::History,
        "regenerate" | "regen" | "r" => match argument {
            Some(arg) => match arg.parse::<usize>() {
                Ok(index) => ChatCommand::Regenerate(Some(index)),
                Err(_) => {
                    ChatCommand::Invalid("/regenerate expects a message number".to_string())
                }
            },
            None => ChatCommand::Regenerate(None),
        },
        "delete" | "del" => parse_index_command(argument, ChatCommand::Delete, "/delete"),
        "copy" => parse_index_command(argument, ChatCommand::Copy, "/copy"),
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "completion-model" | "cmodel" => match argument {
            Some(model) => ChatCommand::CompletionModel(model.to_string()),
            None => ChatCommand::Invalid("/completion-model requires a model name".to_string()),
        },
        "config" => ChatCommand::Config,
        "stream" => match argument.and_then(parse_on_off) {
            Some(value) => ChatCommand::Stream(value),
            None => ChatCommand::Invalid("/stream expects 'on' or 'off'".to_string()),
        },
        "key" => match argument {
            Some(key) => ChatCommand::Key(key.to_string()),
            None => ChatCommand::Invalid("/key requires an API key".to_string()),
        },
        "context" => match argument.map(|arg| arg.to_lowercase().parse::<ContextMode>()) {
            Some(Ok(mode)) => ChatCommand::Context(mode),
            _ => ChatCommand::Invalid("/context expects 'latest' or 'full'".to_string()),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_index_command<F>(argument: Option<&str>, constructor: F, name: &str) -> ChatCommand
where
    F: Fn(usize) -> ChatCommand,
{
    match argument {
        Some(arg) => match arg.parse::<usize>() {
            Ok(value) => constructor(value),
            Err(_) => ChatCommand::Invalid(format!("{} expects a message number", name)),
        },
        None => ChatCommand::Invalid(format!("{} requires a message number", name)),
    }
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /reset                 Clear the conversation (alias: /clear)
  /history               List messages with their numbers
  /regenerate [n]        Regenerate reply n (default: the last reply)
  /delete <n>            Delete reply n and the message before it
  /copy <n>              Copy message n to the clipboard
  /model <name>          Change the model (e.g., /model llama3-70b-8192)
  /completion-model <name>
                         Change the model used when streaming is off
  /stream on|off         Stream replies or wait for whole ones
  /key <api key>         Store a new Groq API key
  /context latest|full   Send only the latest message, or the whole history
  /config                Show the active configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_reset() {
        assert_eq!(parse_command("/reset"), Some(ChatCommand::Reset));
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Reset));
        assert_eq!(parse_command("/CLEAR"), Some(ChatCommand::Reset));
    }

    #[test]
    fn parse_model() {
        assert_eq!(
            parse_command("/model gemma2-9b-it"),
            Some(ChatCommand::Model("gemma2-9b-it".to_string()))
        );
        assert_eq!(
            parse_command("/model   llama3-8b-8192  "),
            Some(ChatCommand::Model("llama3-8b-8192".to_string()))
        );
        assert_eq!(
            parse_command("/model"),
            Some(ChatCommand::Invalid(
                "/model requires a model name".to_string()
            ))
        );
    }

    #[test]
    fn parse_completion_model_and_config() {
        assert_eq!(
            parse_command("/completion-model llama-3.1-8b-instant"),
            Some(ChatCommand::CompletionModel("llama-3.1-8b-instant".to_string()))
        );
        assert_eq!(
            parse_command("/cmodel gemma2-9b-it"),
            Some(ChatCommand::CompletionModel("gemma2-9b-it".to_string()))
        );
        assert!(matches!(
            parse_command("/completion-model"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
        assert_eq!(parse_command("/config"), Some(ChatCommand::Config));
    }

    #[test]
    fn parse_regenerate() {
        assert_eq!(
            parse_command("/regenerate"),
            Some(ChatCommand::Regenerate(None))
        );
        assert_eq!(
            parse_command("/regenerate 3"),
            Some(ChatCommand::Regenerate(Some(3)))
        );
        assert!(matches!(
            parse_command("/regenerate last"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("message number")
        ));
    }

    #[test]
    fn parse_index_commands() {
        assert_eq!(parse_command("/delete 2"), Some(ChatCommand::Delete(2)));
        assert_eq!(parse_command("/copy 0"), Some(ChatCommand::Copy(0)));
        assert!(matches!(
            parse_command("/delete"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
        assert!(matches!(
            parse_command("/copy -1"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("expects")
        ));
    }

    #[test]
    fn parse_stream() {
        assert_eq!(parse_command("/stream on"), Some(ChatCommand::Stream(true)));
        assert_eq!(parse_command("/stream OFF"), Some(ChatCommand::Stream(false)));
        assert!(matches!(
            parse_command("/stream"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_key() {
        assert_eq!(
            parse_command("/key gsk_abc"),
            Some(ChatCommand::Key("gsk_abc".to_string()))
        );
        assert!(matches!(parse_command("/key"), Some(ChatCommand::Invalid(_))));
    }

    #[test]
    fn parse_context() {
        assert_eq!(
            parse_command("/context full"),
            Some(ChatCommand::Context(ContextMode::FullHistory))
        );
        assert_eq!(
            parse_command("/context Latest"),
            Some(ChatCommand::Context(ContextMode::LatestMessage))
        );
        assert!(matches!(
            parse_command("/context everything"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_unknown() {
        assert_eq!(
            parse_command("/frobnicate"),
            Some(ChatCommand::Invalid("Unknown command: /frobnicate".to_string()))
        );
    }

    #[test]
    fn regular_messages_are_not_commands() {
        assert_eq!(parse_command("Hello"), None);
        assert_eq!(parse_command("what does /help do?"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn help_mentions_every_command() {
        let help = help_text();
        for command in [
            "/reset",
            "/history",
            "/regenerate",
            "/delete",
            "/copy",
            "/model",
            "/completion-model",
            "/stream",
            "/key",
            "/context",
            "/config",
            "/help",
            "/quit",
        ] {
            assert!(help.contains(command), "missing {command}");
        }
    }
}
