//! The Groq client against a mock HTTP server.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quickgroq::chat::{ChatConfig, ChatSession};
use quickgroq::{
    ChatCompletionRequest, CompletionTransport, DeltaEvent, Groq, KnownModel, MemoryCredentials,
    Model, RequestMessage,
};

const COMPLETIONS: &str = "/openai/v1/chat/completions";

fn client(server: &MockServer) -> Groq {
    Groq::with_options(Some(format!("{}/openai/v1/", server.uri())), None).unwrap()
}

fn request(stream: bool) -> ChatCompletionRequest {
    let messages = vec![RequestMessage::user("Hello")];
    let model = Model::Known(KnownModel::Llama3_70b8192);
    if stream {
        ChatCompletionRequest::streaming(model, messages)
    } else {
        ChatCompletionRequest::non_streaming(model, messages)
    }
}

fn event_stream(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

#[tokio::test]
async fn streams_deltas_from_event_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .and(header("authorization", "Bearer gsk_test"))
        .and(header("content-type", "application/json"))
        .and(header("accept", "text/event-stream"))
        .and(body_json(json!({
            "messages": [{"role": "user", "content": "Hello"}],
            "model": "llama3-70b-8192",
            "stream": true,
        })))
        .respond_with(event_stream(concat!(
            "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
            "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n",
            "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let stream = client(&server).stream("gsk_test", request(true)).await.unwrap();
    let events: Vec<DeltaEvent> = stream.map(|event| event.unwrap()).collect().await;
    assert_eq!(
        events,
        vec![
            DeltaEvent::fragment("Hi"),
            DeltaEvent::fragment(" there"),
            DeltaEvent::end_of_turn(),
        ]
    );
}

#[tokio::test]
async fn complete_reads_whole_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .and(header("authorization", "Bearer gsk_test"))
        .and(header("accept", "application/json"))
        .and(body_partial_json(json!({"stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "c2",
            "model": "llama-3.1-8b-instant",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Whole reply"},
                "finish_reason": "stop",
            }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let completion = client(&server)
        .complete("gsk_test", request(false))
        .await
        .unwrap();
    assert_eq!(completion.text(), Some("Whole reply"));
}

#[tokio::test]
async fn unauthorized_maps_to_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .and(header("authorization", "Bearer gsk_bad"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Invalid API Key",
                "type": "invalid_request_error",
                "code": "invalid_api_key",
            }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .stream("gsk_bad", request(true))
        .await
        .err()
        .unwrap();
    assert!(err.is_authentication());
    assert!(err.is_status());
    assert_eq!(err.status_code(), Some(401));
    assert!(err.to_string().contains("Invalid API Key"));
}

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_raw("slow down", "text/plain"),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .complete("gsk_test", request(false))
        .await
        .unwrap_err();
    assert!(err.is_rate_limit());
    assert_eq!(err.status_code(), Some(429));
    assert!(matches!(
        err,
        quickgroq::Error::RateLimit {
            retry_after: Some(7),
            ..
        }
    ));
}

#[tokio::test]
async fn connection_refused_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/openai/v1/", listener.local_addr().unwrap());
    drop(listener);

    let client = Groq::with_options(Some(base_url), None).unwrap();
    let err = client.stream("gsk_test", request(true)).await.err().unwrap();
    assert!(err.is_transport());
    assert!(!err.is_status());
}

#[tokio::test]
async fn server_error_leaves_no_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(
            ResponseTemplate::new(500)
                .insert_header("x-request-id", "req_123")
                .set_body_json(json!({})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = ChatSession::new(
        Arc::new(client(&server)),
        Arc::new(MemoryCredentials::with_api_key("gsk_test")),
        ChatConfig::new().without_greeting(),
    );
    let err = session.send("Hello").await.unwrap_err();
    assert!(err.is_server_error());
    assert_eq!(err.request_id(), Some("req_123"));

    let messages = session.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].is_user);
}

#[tokio::test]
async fn session_streams_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .and(header("authorization", "Bearer gsk_test"))
        .and(body_partial_json(json!({
            "messages": [{"role": "user", "content": "Hello"}],
            "stream": true,
        })))
        .respond_with(event_stream(concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":null}}]}\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let session = ChatSession::new(
        Arc::new(client(&server)),
        Arc::new(MemoryCredentials::with_api_key("gsk_test")),
        ChatConfig::new(),
    );
    session.send("Hello").await.unwrap();

    let messages = session.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].text, "Hello");
    assert_eq!(messages[2].text, "Hi there");
    assert!(messages[2].is_completed());
}
