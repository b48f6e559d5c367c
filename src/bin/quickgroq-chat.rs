//! Interactive chat application for conversing with Groq-hosted models.
//!
//! This binary provides a streaming REPL interface over the Groq
//! chat-completions API.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! QUICKGROQ_API_KEY=gsk_... quickgroq-chat
//!
//! # Specify a model
//! quickgroq-chat --model llama-3.3-70b-versatile
//!
//! # Wait for whole replies and send the full history each turn
//! quickgroq-chat --no-stream --full-history
//!
//! # Disable colors (useful for piping output)
//! quickgroq-chat --no-color
//! ```
//!
//! Without `QUICKGROQ_API_KEY` the key is read from a YAML credentials file;
//! `/key <value>` stores one there.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::task::JoinHandle;

use quickgroq::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, ContextMode, PlainTextRenderer, Renderer,
    ReplyFollower, help_text, parse_command,
};
use quickgroq::{
    CredentialProvider, FileCredentials, Groq, MemoryCredentials, Model, TerminalClipboard,
};

/// Environment variable that overrides stored credentials.
const API_KEY_ENV: &str = "QUICKGROQ_API_KEY";

/// How often an in-progress reply checks for Ctrl+C.
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

/// Work handed to a background task while the REPL renders.
enum Turn {
    Stream(String),
    Complete(String),
    Regenerate(usize),
}

/// Main entry point for the quickgroq-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("quickgroq-chat [OPTIONS]");
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    let config = ChatConfig::load(&args)?;
    let use_color = config.use_color;
    let credentials = credentials(&args);
    let client = Groq::with_options(config.base_url.clone(), config.timeout())?;
    tracing::debug!(endpoint = %client.endpoint(), "using endpoint");

    let session = Arc::new(
        ChatSession::new(Arc::new(client), credentials, config)
            .with_clipboard(Arc::new(TerminalClipboard)),
    );
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!("Groq Chat (model: {})", session.model());
    println!("Type /help for commands, /quit to exit\n");
    for (index, message) in session.messages().iter().enumerate() {
        renderer.print_message(index, message);
    }

    loop {
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                let turn = match parse_command(line) {
                    Some(ChatCommand::Quit) => {
                        println!("Goodbye!");
                        break;
                    }
                    Some(ChatCommand::Regenerate(index)) => {
                        match index.or_else(|| last_reply_index(&session)) {
                            Some(index) => Turn::Regenerate(index),
                            None => {
                                renderer.print_error("There is no reply to regenerate.");
                                continue;
                            }
                        }
                    }
                    Some(command) => {
                        handle_command(&session, &mut renderer, command);
                        continue;
                    }
                    None if session.streaming() => Turn::Stream(line.to_string()),
                    None => Turn::Complete(line.to_string()),
                };

                run_turn(&session, &mut renderer, &interrupted, turn).await;
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Picks the credential source: the environment, then a YAML file.
fn credentials(args: &ChatArgs) -> Arc<dyn CredentialProvider> {
    if let Ok(api_key) = std::env::var(API_KEY_ENV)
        && !api_key.trim().is_empty()
    {
        return Arc::new(MemoryCredentials::with_api_key(api_key.trim()));
    }
    let path = args
        .credentials
        .as_ref()
        .map(std::path::PathBuf::from)
        .or_else(FileCredentials::default_path);
    match path {
        Some(path) => Arc::new(FileCredentials::new(path)),
        None => {
            tracing::warn!("no configuration directory; the API key will not be saved");
            Arc::new(MemoryCredentials::new())
        }
    }
}

fn last_reply_index(session: &ChatSession) -> Option<usize> {
    session.messages().iter().rposition(|m| !m.is_user)
}

fn handle_command(session: &ChatSession, renderer: &mut PlainTextRenderer, command: ChatCommand) {
    match command {
        ChatCommand::Reset => {
            session.reset();
            renderer.print_info("Conversation cleared.");
        }
        ChatCommand::History => {
            let messages = session.messages();
            if messages.is_empty() {
                renderer.print_info("(no messages)");
            }
            for (index, message) in messages.iter().enumerate() {
                renderer.print_message(index, message);
            }
        }
        ChatCommand::Delete(index) => match session.delete_pair(index) {
            Ok(()) => renderer.print_info(&format!("Deleted messages {} and {index}.", index - 1)),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::Copy(index) => match session.copy(index) {
            Ok(()) => renderer.print_info(&format!("Copied message {index}.")),
            Err(_) => renderer.print_error(&format!(
                "There is no message {index}; /history lists them."
            )),
        },
        ChatCommand::Model(model_name) => {
            session.set_model(Model::from(model_name.as_str()));
            renderer.print_info(&format!("Model changed to: {}", model_name));
        }
        ChatCommand::CompletionModel(model_name) => {
            session.set_completion_model(Model::from(model_name.as_str()));
            renderer.print_info(&format!("Completion model changed to: {}", model_name));
        }
        ChatCommand::Config => match serde_yaml::to_string(&session.config_snapshot()) {
            Ok(yaml) => {
                for line in yaml.lines() {
                    println!("    {}", line);
                }
            }
            Err(err) => renderer.print_error(&format!("Failed to render configuration: {err}")),
        },
        ChatCommand::Stream(stream) => {
            session.set_streaming(stream);
            if stream {
                renderer.print_info("Streaming enabled.");
            } else {
                renderer.print_info(&format!(
                    "Streaming disabled; replies come from {}.",
                    session.completion_model()
                ));
            }
        }
        ChatCommand::Key(api_key) => match session.set_api_key(&api_key) {
            Ok(()) => renderer.print_info("API key saved."),
            Err(err) => renderer.print_error(&format!("Failed to save API key: {err}")),
        },
        ChatCommand::Context(mode) => {
            session.set_context_mode(mode);
            match mode {
                ContextMode::LatestMessage => {
                    renderer.print_info("Only the latest message will be sent.")
                }
                ContextMode::FullHistory => {
                    renderer.print_info("The whole conversation will be sent.")
                }
            }
        }
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
        }
        ChatCommand::Invalid(message) => {
            renderer.print_error(&message);
        }
        ChatCommand::Quit | ChatCommand::Regenerate(_) => {}
    }
}

/// Runs `turn` on a task and renders the reply as the store changes.
///
/// The follower is built before the task starts, so a reply that settles
/// before the first render is still printed in full.
///
/// Ctrl+C aborts the task; the abandoned reply is marked failed.
async fn run_turn(
    session: &Arc<ChatSession>,
    renderer: &mut PlainTextRenderer,
    interrupted: &AtomicBool,
    turn: Turn,
) {
    let mut follower = ReplyFollower::new(&session.messages());
    let mut changes = session.store().subscribe();
    let task_session = Arc::clone(session);
    let mut handle: JoinHandle<quickgroq::Result<()>> = tokio::spawn(async move {
        match turn {
            Turn::Stream(text) => task_session.send(&text).await,
            Turn::Complete(text) => task_session.send_complete(&text).await,
            Turn::Regenerate(index) => task_session.regenerate(index).await,
        }
    });

    let mut started = false;
    let mut tick = tokio::time::interval(INTERRUPT_POLL);

    let outcome = loop {
        tokio::select! {
            joined = &mut handle => break Some(joined),
            changed = changes.changed() => {
                if changed.is_err() {
                    continue;
                }
                if let Some(text) = follower.advance(&session.messages()) {
                    if !started {
                        renderer.start_response();
                        started = true;
                    }
                    renderer.print_text(&text);
                }
            }
            _ = tick.tick() => {
                if interrupted.swap(false, Ordering::Relaxed) {
                    handle.abort();
                    let _ = (&mut handle).await;
                    break None;
                }
            }
        }
    };

    if let Some(text) = follower.advance(&session.messages()) {
        if !started {
            renderer.start_response();
            started = true;
        }
        renderer.print_text(&text);
    }

    match outcome {
        None => renderer.print_interrupted(),
        Some(Ok(Ok(()))) => {
            if started {
                renderer.finish_response();
            }
        }
        Some(Ok(Err(err))) => {
            if started {
                renderer.finish_response();
            }
            renderer.print_error(&err.to_string());
        }
        Some(Err(err)) => renderer.print_error(&format!("Reply task failed: {err}")),
    }
}
