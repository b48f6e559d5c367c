//! Session behavior against stub transports.
//!
//! The channel transport hands each test the sending half of the byte stream,
//! so tests can act while a reply is still in flight.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures::channel::mpsc;

use quickgroq::chat::{ChatConfig, ChatSession};
use quickgroq::{
    ChatCompletion, ChatCompletionRequest, ChatMessage, CompletionTransport, DeltaStream, Error,
    MemoryCredentials, Result, decode_deltas,
};

type Sender = mpsc::UnboundedSender<Result<Bytes>>;

/// Serves one streamed reply whose bytes the test pushes by hand.
struct ChannelTransport {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Result<Bytes>>>>,
}

impl ChannelTransport {
    fn new() -> (Sender, Arc<Self>) {
        let (tx, rx) = mpsc::unbounded();
        let transport = Arc::new(Self {
            receiver: Mutex::new(Some(rx)),
        });
        (tx, transport)
    }
}

#[async_trait::async_trait]
impl CompletionTransport for ChannelTransport {
    async fn stream(&self, _: &str, _: ChatCompletionRequest) -> Result<DeltaStream> {
        let receiver = self
            .receiver
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::precondition("stream already taken"))?;
        Ok(Box::pin(decode_deltas(receiver)))
    }

    async fn complete(&self, _: &str, _: ChatCompletionRequest) -> Result<ChatCompletion> {
        Err(Error::precondition("not used"))
    }
}

/// Rejects every request before streaming starts.
struct RejectingTransport;

#[async_trait::async_trait]
impl CompletionTransport for RejectingTransport {
    async fn stream(&self, _: &str, _: ChatCompletionRequest) -> Result<DeltaStream> {
        Err(Error::authentication("Invalid API Key"))
    }

    async fn complete(&self, _: &str, _: ChatCompletionRequest) -> Result<ChatCompletion> {
        Err(Error::service_unavailable("over capacity", Some(5)))
    }
}

fn session(transport: Arc<dyn CompletionTransport>) -> Arc<ChatSession> {
    Arc::new(ChatSession::new(
        transport,
        Arc::new(MemoryCredentials::with_api_key("gsk_test")),
        ChatConfig::new().without_greeting(),
    ))
}

fn line(content: &str) -> Result<Bytes> {
    Ok(Bytes::from(format!(
        "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{content}\"}}}}]}}\n\n"
    )))
}

fn end() -> Result<Bytes> {
    Ok(Bytes::from_static(
        b"data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\ndata: [DONE]\n\n",
    ))
}

/// Waits until `predicate` holds for the session's messages.
async fn wait_for(session: &ChatSession, predicate: impl Fn(&[ChatMessage]) -> bool) {
    let mut changes = session.store().subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !predicate(&session.messages()) {
            changes.changed().await.unwrap();
        }
    })
    .await
    .expect("condition not reached");
}

fn streaming(messages: &[ChatMessage]) -> bool {
    messages.last().map(ChatMessage::is_in_flight).unwrap_or(false)
}

#[tokio::test]
async fn fragments_accumulate_until_end_of_turn() {
    let (tx, transport) = ChannelTransport::new();
    let session = session(transport);
    let task = tokio::spawn({
        let session = session.clone();
        async move { session.send("Hello").await }
    });

    wait_for(&session, streaming).await;
    tx.unbounded_send(line("Hi")).unwrap();
    wait_for(&session, |m| m.last().map(|m| m.text == "Hi").unwrap_or(false)).await;
    assert!(session.store().last().unwrap().is_in_flight());

    tx.unbounded_send(line(" there")).unwrap();
    tx.unbounded_send(end()).unwrap();
    task.await.unwrap().unwrap();

    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].text, "Hello");
    assert_eq!(messages[1].text, "Hi there");
    assert!(messages[1].is_completed());
    assert!(!session.is_busy());
}

#[tokio::test]
async fn lines_split_across_chunks() {
    let (tx, transport) = ChannelTransport::new();
    let session = session(transport);
    for part in [
        "data: {\"choices\":[{\"del",
        "ta\":{\"content\":\"Hi\"}}]}\n",
        "\ndata: {not valid json}\n",
        "data: {\"choices\":[{\"delta\":{\"content\":null}}]}\n",
    ] {
        tx.unbounded_send(Ok(Bytes::from(part))).unwrap();
    }
    drop(tx);

    session.send("Hello").await.unwrap();
    let reply = session.store().last().unwrap();
    assert_eq!(reply.text, "Hi");
    assert!(reply.is_completed());
}

#[tokio::test]
async fn second_send_while_streaming_is_busy() {
    let (tx, transport) = ChannelTransport::new();
    let session = session(transport);
    let task = tokio::spawn({
        let session = session.clone();
        async move { session.send("first").await }
    });

    wait_for(&session, streaming).await;
    let err = session.send("second").await.unwrap_err();
    assert!(err.is_busy());
    let err = session.regenerate(1).await.unwrap_err();
    assert!(err.is_busy());
    assert_eq!(session.messages().len(), 2);

    tx.unbounded_send(end()).unwrap();
    task.await.unwrap().unwrap();
    assert!(!session.is_busy());
}

#[tokio::test]
async fn stream_error_marks_reply_failed() {
    let (tx, transport) = ChannelTransport::new();
    let session = session(transport);
    tx.unbounded_send(line("Partial")).unwrap();
    tx.unbounded_send(Err(Error::streaming("connection reset", None)))
        .unwrap();

    let err = session.send("Hello").await.unwrap_err();
    assert!(err.is_streaming());

    let reply = session.store().last().unwrap();
    assert_eq!(reply.text, "Partial");
    assert!(reply.is_failed());
    assert!(!session.is_busy());
}

#[tokio::test]
async fn dropped_send_marks_reply_failed() {
    let (tx, transport) = ChannelTransport::new();
    let session = session(transport);
    tx.unbounded_send(line("Hi")).unwrap();

    let outcome = tokio::time::timeout(Duration::from_millis(100), session.send("Hello")).await;
    assert!(outcome.is_err());

    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text, "Hi");
    assert!(messages[1].is_failed());
    assert!(!session.is_busy());
    drop(tx);
}

#[tokio::test]
async fn reset_mid_stream_drops_later_fragments() {
    let (tx, transport) = ChannelTransport::new();
    let session = session(transport);
    let task = tokio::spawn({
        let session = session.clone();
        async move { session.send("Hello").await }
    });

    wait_for(&session, streaming).await;
    session.reset();
    assert!(session.messages().is_empty());

    tx.unbounded_send(line("late")).unwrap();
    tx.unbounded_send(end()).unwrap();
    task.await.unwrap().unwrap();
    assert!(session.messages().is_empty());
}

#[tokio::test]
async fn request_error_leaves_no_placeholder() {
    let session = session(Arc::new(RejectingTransport));

    let err = session.send("Hello").await.unwrap_err();
    assert!(err.is_authentication());
    assert_eq!(err.status_code(), Some(401));

    let messages = session.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].is_user);
    assert!(!session.is_busy());

    let err = session.send_complete("Hello again").await.unwrap_err();
    assert_eq!(err.status_code(), Some(503));
    assert_eq!(session.messages().len(), 2);
}

#[tokio::test]
async fn send_without_appending_user_message() {
    let (tx, transport) = ChannelTransport::new();
    let session = session(transport);
    tx.unbounded_send(line("Hi")).unwrap();
    tx.unbounded_send(end()).unwrap();

    session.send_with("Hello", false).await.unwrap();
    let messages = session.messages();
    assert_eq!(messages.len(), 1);
    assert!(!messages[0].is_user);
    assert_eq!(messages[0].text, "Hi");
}

#[tokio::test]
async fn regenerate_streams_into_the_same_slot() {
    let (tx, transport) = ChannelTransport::new();
    let session = session(transport);
    let store = session.store();
    store.append(ChatMessage::user("q1"));
    store.append(ChatMessage::bot("old answer"));
    store.append(ChatMessage::user("q2"));
    store.append(ChatMessage::bot("a2"));

    tx.unbounded_send(line("new")).unwrap();
    tx.unbounded_send(line(" answer")).unwrap();
    tx.unbounded_send(end()).unwrap();
    session.regenerate(1).await.unwrap();

    let texts: Vec<_> = session.messages().into_iter().map(|m| m.text).collect();
    assert_eq!(texts, vec!["q1", "new answer", "q2", "a2"]);
    assert!(session.store().get(1).unwrap().is_completed());
}

#[tokio::test]
async fn delete_pair_keeps_other_turns() {
    let session = session(Arc::new(RejectingTransport));
    let store = session.store();
    for text in ["q1", "a1", "q2", "a2"] {
        if text.starts_with('q') {
            store.append(ChatMessage::user(text));
        } else {
            store.append(ChatMessage::bot(text));
        }
    }

    assert!(session.delete_pair(0).unwrap_err().is_precondition());
    assert!(session.delete_pair(4).unwrap_err().is_precondition());
    session.delete_pair(3).unwrap();

    let texts: Vec<_> = session.messages().into_iter().map(|m| m.text).collect();
    assert_eq!(texts, vec!["q1", "a1"]);
}
