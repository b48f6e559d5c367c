//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which turns user input into
//! completion requests and applies the streamed replies to a [`MessageStore`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use futures::StreamExt;

use crate::chat::config::{ChatConfig, ContextMode};
use crate::client::CompletionTransport;
use crate::clipboard::{Clipboard, MemoryClipboard};
use crate::credentials::{API_KEY_STORAGE_KEY, CredentialProvider};
use crate::error::{Error, Result};
use crate::observability::{
    SESSION_BUSY, SESSION_FAILED_REPLIES, SESSION_REPLY_DURATION, SESSION_SENDS,
};
use crate::store::MessageStore;
use crate::types::{ChatCompletionRequest, ChatMessage, MessageId, Model, RequestMessage};

/// A chat session that owns the conversation and talks to the API.
///
/// All operations take `&self`; share the session through an `Arc` to run a
/// send on another task while rendering from [`ChatSession::store`].
pub struct ChatSession {
    store: Arc<MessageStore>,
    transport: Arc<dyn CompletionTransport>,
    credentials: Arc<dyn CredentialProvider>,
    clipboard: Arc<dyn Clipboard>,
    config: RwLock<ChatConfig>,
    in_flight: AtomicBool,
}

impl ChatSession {
    /// Creates a new session. The store is seeded with the configured greeting.
    pub fn new(
        transport: Arc<dyn CompletionTransport>,
        credentials: Arc<dyn CredentialProvider>,
        config: ChatConfig,
    ) -> Self {
        let store = match &config.greeting {
            Some(greeting) => MessageStore::with_greeting(greeting.clone()),
            None => MessageStore::new(),
        };
        Self::with_store(Arc::new(store), transport, credentials, config)
    }

    /// Creates a session over an existing store.
    pub fn with_store(
        store: Arc<MessageStore>,
        transport: Arc<dyn CompletionTransport>,
        credentials: Arc<dyn CredentialProvider>,
        config: ChatConfig,
    ) -> Self {
        Self {
            store,
            transport,
            credentials,
            clipboard: Arc::new(MemoryClipboard::new()),
            config: RwLock::new(config),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Replaces the clipboard used by [`ChatSession::copy`].
    pub fn with_clipboard(mut self, clipboard: Arc<dyn Clipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    /// The store holding the conversation.
    pub fn store(&self) -> &Arc<MessageStore> {
        &self.store
    }

    /// A snapshot of the conversation.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.store.messages()
    }

    /// Returns true while a reply is streaming.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) || self.store.in_flight()
    }

    /// Sends a user message and streams the reply into the store.
    ///
    /// # Errors
    ///
    /// See [`ChatSession::send_with`].
    pub async fn send(&self, text: &str) -> Result<()> {
        self.send_with(text, true).await
    }

    /// Sends `text` and streams the reply into the store.
    ///
    /// This method:
    /// 1. Appends the user message, unless `should_append_user_message` is false
    /// 2. Sends a streaming request to the API
    /// 3. Appends an empty bot placeholder once the server accepts the request
    /// 4. Appends each streamed fragment to the placeholder
    /// 5. Marks the placeholder complete at the end of the turn
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] while another reply is streaming,
    /// [`Error::Validation`] for blank input, and any request error from the
    /// transport. Request errors leave no placeholder behind. An error after
    /// streaming began marks the placeholder failed.
    pub async fn send_with(&self, text: &str, should_append_user_message: bool) -> Result<()> {
        validate_text(text)?;
        let _guard = self.begin()?;

        let position = self.store.len();
        if should_append_user_message {
            self.store.append(ChatMessage::user(text));
        }
        let context = self.context(text, position);
        self.stream_reply(context, None).await
    }

    /// Sends a user message and waits for the whole reply.
    ///
    /// The reply is added as one completed bot message. Nothing but the user
    /// message is added if the request fails.
    ///
    /// # Errors
    ///
    /// Same as [`ChatSession::send`].
    pub async fn send_complete(&self, text: &str) -> Result<()> {
        validate_text(text)?;
        let _guard = self.begin()?;

        let position = self.store.len();
        self.store.append(ChatMessage::user(text));
        let context = self.context(text, position);

        let model = self.completion_model();
        let request = ChatCompletionRequest::non_streaming(model, context);
        let api_key = self.credentials.api_key();
        SESSION_SENDS.click();
        let start = Instant::now();
        let completion = self.transport.complete(&api_key, request).await?;
        SESSION_REPLY_DURATION.add(start.elapsed().as_secs_f64());
        match completion.text() {
            Some(reply) => {
                self.store.append(ChatMessage::bot(reply));
                Ok(())
            }
            None => Err(Error::serialization("completion contained no choices", None)),
        }
    }

    /// Discards the bot reply at `index` and streams a new one for the same
    /// user message.
    ///
    /// The new reply takes the old one's position, so the turn stays paired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Index`] for an out-of-bounds index,
    /// [`Error::Precondition`] unless `index` holds a bot reply directly after
    /// a user message, [`Error::Busy`] while another reply is streaming, and
    /// any request error from the transport.
    pub async fn regenerate(&self, index: usize) -> Result<()> {
        let _guard = self.begin()?;
        let question = self.store.remove_reply(index)?;
        let context = self.context(&question, index - 1);
        self.stream_reply(context, Some(index)).await
    }

    /// Regenerates the reply with `id`. Does nothing if it no longer exists.
    ///
    /// # Errors
    ///
    /// Same as [`ChatSession::regenerate`].
    pub async fn regenerate_message(&self, id: MessageId) -> Result<()> {
        match self.store.index_of(id) {
            Some(index) => self.regenerate(index).await,
            None => Ok(()),
        }
    }

    /// Deletes the bot reply at `index` together with the message before it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] when `index` is zero or out of bounds.
    pub fn delete_pair(&self, index: usize) -> Result<()> {
        self.store.remove_pair(index).map(|_| ())
    }

    /// Deletes the turn ending with `id`. Does nothing if it no longer exists.
    ///
    /// # Errors
    ///
    /// Same as [`ChatSession::delete_pair`].
    pub fn delete_message_pair(&self, id: MessageId) -> Result<()> {
        match self.store.index_of(id) {
            Some(index) => self.delete_pair(index),
            None => Ok(()),
        }
    }

    /// Copies the text of the message at `index` to the clipboard.
    ///
    /// A clipboard failure is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Index`] when there is no message at `index`.
    pub fn copy(&self, index: usize) -> Result<()> {
        let message = self
            .store
            .get(index)
            .ok_or_else(|| Error::index(index, self.store.len()))?;
        self.copy_text(&message.text);
        Ok(())
    }

    /// Copies the text of the message with `id`. Does nothing if it is gone.
    pub fn copy_message(&self, id: MessageId) {
        if let Some(message) = self.store.index_of(id).and_then(|i| self.store.get(i)) {
            self.copy_text(&message.text);
        }
    }

    fn copy_text(&self, text: &str) {
        if let Err(err) = self.clipboard.set_text(text) {
            tracing::warn!("copy to clipboard failed: {err}");
        }
    }

    /// Clears the conversation.
    ///
    /// Safe while a reply is streaming; the rest of that reply is dropped.
    pub fn reset(&self) {
        self.store.clear();
    }

    /// Returns the model used for streamed replies.
    pub fn model(&self) -> Model {
        self.config().model.clone()
    }

    /// Changes the model used for streamed replies.
    pub fn set_model(&self, model: Model) {
        self.config_mut().model = model;
    }

    /// Returns the model used by [`ChatSession::send_complete`].
    pub fn completion_model(&self) -> Model {
        self.config().completion_model.clone()
    }

    /// Changes the model used by [`ChatSession::send_complete`].
    pub fn set_completion_model(&self, model: Model) {
        self.config_mut().completion_model = model;
    }

    /// Returns how much of the conversation is sent with each request.
    pub fn context_mode(&self) -> ContextMode {
        self.config().context
    }

    /// Changes how much of the conversation is sent with each request.
    pub fn set_context_mode(&self, context: ContextMode) {
        self.config_mut().context = context;
    }

    /// Returns true if plain sends should stream.
    pub fn streaming(&self) -> bool {
        self.config().stream
    }

    /// Chooses between streamed and whole replies for the front-end.
    pub fn set_streaming(&self, stream: bool) {
        self.config_mut().stream = stream;
    }

    /// Returns the API key that the next request will use.
    pub fn api_key(&self) -> String {
        self.credentials.api_key()
    }

    /// Stores a new API key with the credential provider.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the key cannot be stored.
    pub fn set_api_key(&self, api_key: &str) -> Result<()> {
        self.credentials.set(API_KEY_STORAGE_KEY, api_key.trim())
    }

    /// A copy of the active configuration.
    pub fn config_snapshot(&self) -> ChatConfig {
        self.config().clone()
    }

    fn config(&self) -> std::sync::RwLockReadGuard<'_, ChatConfig> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn config_mut(&self) -> std::sync::RwLockWriteGuard<'_, ChatConfig> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the single in-flight slot.
    fn begin(&self) -> Result<InFlight<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            SESSION_BUSY.click();
            return Err(Error::busy("a reply is still streaming"));
        }
        let guard = InFlight(&self.in_flight);
        if self.store.in_flight() {
            SESSION_BUSY.click();
            return Err(Error::busy("the conversation has a reply in progress"));
        }
        Ok(guard)
    }

    /// Builds the request messages for `text`, which sits at `position`.
    fn context(&self, text: &str, position: usize) -> Vec<RequestMessage> {
        let mut context = Vec::new();
        if self.context_mode() == ContextMode::FullHistory {
            for message in self.store.messages().iter().take(position) {
                if message.is_user {
                    context.push(RequestMessage::user(message.text.clone()));
                } else if message.is_completed() && !message.text.is_empty() {
                    context.push(RequestMessage::assistant(message.text.clone()));
                }
            }
        }
        context.push(RequestMessage::user(text));
        context
    }

    /// Requests a streamed reply and applies it to a new placeholder.
    ///
    /// The placeholder goes at `position`, or at the end when `None`.
    async fn stream_reply(&self, context: Vec<RequestMessage>, position: Option<usize>) -> Result<()> {
        let request = ChatCompletionRequest::streaming(self.model(), context);
        let api_key = self.credentials.api_key();
        SESSION_SENDS.click();
        let start = Instant::now();
        let mut deltas = self.transport.stream(&api_key, request).await?;

        let placeholder = ChatMessage::placeholder();
        let mut reply = PendingReply::new(&self.store, placeholder.id);
        match position {
            Some(index) => {
                self.store.insert(index, placeholder);
            }
            None => self.store.append(placeholder),
        }

        while let Some(event) = deltas.next().await {
            match event {
                Ok(event) => match event.fragment {
                    Some(fragment) => {
                        self.store.append_fragment_to(reply.id, &fragment);
                    }
                    None => {
                        reply.complete();
                        SESSION_REPLY_DURATION.add(start.elapsed().as_secs_f64());
                        return Ok(());
                    }
                },
                Err(err) => {
                    reply.fail();
                    return Err(err);
                }
            }
        }
        tracing::debug!("stream closed without an end-of-turn chunk");
        reply.complete();
        SESSION_REPLY_DURATION.add(start.elapsed().as_secs_f64());
        Ok(())
    }
}

fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::validation(
            "message text is empty",
            Some("text".to_string()),
        ));
    }
    Ok(())
}

/// Releases the in-flight slot when dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A placeholder being filled by a stream.
///
/// Dropping it before [`PendingReply::complete`] marks the placeholder failed,
/// which covers both stream errors and a caller that abandons the future.
struct PendingReply<'a> {
    store: &'a MessageStore,
    id: MessageId,
    settled: bool,
}

impl<'a> PendingReply<'a> {
    fn new(store: &'a MessageStore, id: MessageId) -> Self {
        Self {
            store,
            id,
            settled: false,
        }
    }

    fn complete(&mut self) {
        self.store.mark_completed(self.id);
        self.settled = true;
    }

    fn fail(&mut self) {
        SESSION_FAILED_REPLIES.click();
        self.store.mark_failed(self.id);
        self.settled = true;
    }
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(id = %self.id, "reply abandoned before its stream ended");
            self.fail();
        }
    }
}
