//! The ordered message store behind a conversation.
//!
//! [`MessageStore`] is the single owner of the conversation's messages. All
//! mutations go through one mutex and bump a version number, which is
//! published on a `watch` channel so renderers can redraw after every change
//! without seeing a half-applied mutation.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::types::{ChatMessage, Completion, MessageId};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct Inner {
    messages: Vec<ChatMessage>,
    version: u64,
}

/// Ordered, identity-addressed collection of chat messages.
///
/// Insertion order is conversation order. Nothing reorders messages.
#[derive(Debug)]
pub struct MessageStore {
    inner: Mutex<Inner>,
    notify: watch::Sender<u64>,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            inner: Mutex::new(Inner::default()),
            notify,
        }
    }

    /// Create a store seeded with a completed bot greeting.
    pub fn with_greeting(text: impl Into<String>) -> Self {
        let store = Self::new();
        store.append(ChatMessage::bot(text));
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` under the lock, publishing a new version if it reports a change.
    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<ChatMessage>) -> (T, bool)) -> T {
        let mut inner = self.lock();
        let (result, changed) = f(&mut inner.messages);
        if changed {
            inner.version += 1;
            self.notify.send_replace(inner.version);
        }
        result
    }

    /// Subscribe to change notifications. The value is the store version.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    /// Current version; bumped by every mutation.
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    /// Returns true if the store holds no messages.
    pub fn is_empty(&self) -> bool {
        self.lock().messages.is_empty()
    }

    /// A copy of the message at `index`.
    pub fn get(&self, index: usize) -> Option<ChatMessage> {
        self.lock().messages.get(index).cloned()
    }

    /// A copy of the last message.
    pub fn last(&self) -> Option<ChatMessage> {
        self.lock().messages.last().cloned()
    }

    /// A copy of every message, in order.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().messages.clone()
    }

    /// Position of the message with `id`.
    ///
    /// `None` means the message is gone; callers treat that as nothing to do.
    pub fn index_of(&self, id: MessageId) -> Option<usize> {
        self.lock().messages.iter().position(|m| m.id == id)
    }

    /// Returns true if any bot reply is still pending.
    pub fn in_flight(&self) -> bool {
        self.lock().messages.iter().any(ChatMessage::is_in_flight)
    }

    /// Add `message` at the end.
    pub fn append(&self, message: ChatMessage) {
        self.mutate(|messages| {
            messages.push(message);
            ((), true)
        })
    }

    /// Insert `message` at `index`, or at the end if `index` is past it.
    ///
    /// Returns the position the message landed at.
    pub fn insert(&self, index: usize, message: ChatMessage) -> usize {
        self.mutate(|messages| {
            let index = index.min(messages.len());
            messages.insert(index, message);
            (index, true)
        })
    }

    /// Append `fragment` to the last message. No-op on an empty store.
    pub fn append_fragment(&self, fragment: &str) {
        self.mutate(|messages| match messages.last_mut() {
            Some(last) => {
                last.text.push_str(fragment);
                ((), true)
            }
            None => ((), false),
        })
    }

    /// Append `fragment` to the message with `id`. No-op if it is gone.
    pub fn append_fragment_to(&self, id: MessageId, fragment: &str) -> bool {
        self.mutate(|messages| match messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.text.push_str(fragment);
                (true, true)
            }
            None => (false, false),
        })
    }

    /// Mark the last message complete, if there is one.
    pub fn mark_last_completed(&self) {
        self.mutate(|messages| match messages.last_mut() {
            Some(last) => {
                last.completion = Completion::Complete;
                ((), true)
            }
            None => ((), false),
        })
    }

    /// Mark the message with `id` complete. No-op if it is gone.
    pub fn mark_completed(&self, id: MessageId) -> bool {
        self.set_completion(id, Completion::Complete)
    }

    /// Mark the message with `id` failed. No-op if it is gone.
    pub fn mark_failed(&self, id: MessageId) -> bool {
        self.set_completion(id, Completion::Failed)
    }

    fn set_completion(&self, id: MessageId, completion: Completion) -> bool {
        self.mutate(|messages| match messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.completion = completion;
                (true, true)
            }
            None => (false, false),
        })
    }

    /// Remove and return the message at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Index`] when `index` is out of bounds; the store is left
    /// untouched.
    pub fn remove_at(&self, index: usize) -> Result<ChatMessage> {
        self.mutate(|messages| {
            if index >= messages.len() {
                return (Err(Error::index(index, messages.len())), false);
            }
            (Ok(messages.remove(index)), true)
        })
    }

    /// Remove the bot reply at `index` and return the text of the user message
    /// it answered.
    ///
    /// The checks and the removal happen under one lock, so a concurrent edit
    /// cannot slip a different message into `index` between them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Index`] when `index` is out of bounds and
    /// [`Error::Precondition`] unless `index` holds a bot reply directly after a
    /// user message. The store is left untouched on error.
    pub fn remove_reply(&self, index: usize) -> Result<String> {
        self.mutate(|messages| {
            if index >= messages.len() {
                return (Err(Error::index(index, messages.len())), false);
            }
            if index == 0 {
                return (
                    Err(Error::precondition(
                        "the first message has no user message to answer",
                    )),
                    false,
                );
            }
            if messages[index].is_user || !messages[index - 1].is_user {
                return (
                    Err(Error::precondition(format!(
                        "message {index} is not a bot reply to a user message"
                    ))),
                    false,
                );
            }
            messages.remove(index);
            (Ok(messages[index - 1].text.clone()), true)
        })
    }

    /// Remove the bot message at `bot_index` and the message before it.
    ///
    /// The later index is removed first so the earlier one stays valid. Returns
    /// the removed `(previous, bot)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] when `bot_index` is zero or out of
    /// bounds; the store is left untouched.
    pub fn remove_pair(&self, bot_index: usize) -> Result<(ChatMessage, ChatMessage)> {
        self.mutate(|messages| {
            if bot_index == 0 {
                return (
                    Err(Error::precondition(
                        "cannot remove a pair ending at the first message",
                    )),
                    false,
                );
            }
            if bot_index >= messages.len() {
                return (
                    Err(Error::precondition(format!(
                        "pair index {bot_index} out of bounds for {} messages",
                        messages.len()
                    ))),
                    false,
                );
            }
            let bot = messages.remove(bot_index);
            let previous = messages.remove(bot_index - 1);
            (Ok((previous, bot)), true)
        })
    }

    /// Remove every message.
    pub fn clear(&self) {
        self.mutate(|messages| {
            messages.clear();
            ((), true)
        })
    }
}
