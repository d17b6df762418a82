#[path = "../crates/responses_api/tests/support/mod.rs"]
mod support;

use std::sync::atomic::Ordering;

use assert_matches::assert_matches;
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use tokio::time::{timeout, Duration};

use responses_kit::{
    cancel_signal, ApiConfig, Error, ResponseRequest, ResponsesClient, RetryPolicy,
    StreamEventKind,
};
use support::{sse_frames, sse_response, ResponseChunk, ScriptedResponse, ScriptedServer};

const FRAMES: [&str; 5] = [
    r#"{"type":"response.created","sequence_number":0,"response":{"id":"r1","status":"in_progress","output":[]}}"#,
    r#"{"type":"response.output_text.delta","sequence_number":1,"item_id":"m1","output_index":0,"content_index":0,"delta":"he"}"#,
    r#"{"type":"response.output_text.delta","sequence_number":2,"item_id":"m1","output_index":0,"content_index":0,"delta":"llo"}"#,
    r#"{"type":"response.output_text.done","sequence_number":3,"item_id":"m1","output_index":0,"content_index":0,"text":"hello"}"#,
    r#"{"type":"response.completed","sequence_number":4,"response":{"id":"r1","status":"completed","output":[{"type":"message","content":[{"type":"output_text","text":"hello"}]}]}}"#,
];

fn client(server: &ScriptedServer) -> ResponsesClient {
    ResponsesClient::new(
        ApiConfig::new("sk-test")
            .with_base_url(&server.base_url)
            .with_retry(RetryPolicy::none()),
    )
    .expect("client")
}

#[tokio::test]
async fn stream_delivers_events_in_order() {
    let server = ScriptedServer::new(vec![sse_response(&FRAMES)]).await;
    let client = client(&server);

    let mut events = client
        .stream(&ResponseRequest::new("hi").with_stream(true), None)
        .await
        .expect("stream");

    let mut tags = Vec::new();
    let mut sequence = Vec::new();
    let mut text = String::new();
    while events.next().await {
        let event = events.event().expect("current event");
        tags.push(event.tag());
        sequence.push(event.sequence_number);
        if let Some(delta) = event.delta() {
            text.push_str(delta);
        }
    }

    assert!(events.err().is_none());
    assert_eq!(
        tags,
        vec![
            "response.created",
            "response.output_text.delta",
            "response.output_text.delta",
            "response.output_text.done",
            "response.completed",
        ]
    );
    assert!(sequence.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(text, "hello");

    let requests = server.requests();
    assert_eq!(requests[0].json()["stream"], true);
    assert_eq!(requests[0].header("accept"), Some("text/event-stream"));
}

#[tokio::test]
async fn stream_survives_arbitrary_chunking() {
    let body = sse_frames(&FRAMES);
    let chunks = body
        .chunks(7)
        .map(|bytes| ResponseChunk {
            delay_ms: 1,
            bytes: bytes.to_vec(),
        })
        .collect();
    let server = ScriptedServer::new(vec![ScriptedResponse::Respond {
        status: 200,
        content_type: "text/event-stream",
        chunks,
    }])
    .await;
    let client = client(&server);

    let events: Vec<_> = client
        .stream(&ResponseRequest::new("hi").with_stream(true), None)
        .await
        .expect("stream")
        .collect()
        .await;

    assert_eq!(events.len(), 5);
    let last = events.last().expect("last").as_ref().expect("event");
    assert_matches!(&last.kind, StreamEventKind::ResponseCompleted(done) if done.response.id == "r1");
}

#[tokio::test]
async fn unknown_event_is_sent_then_closes() {
    let server = ScriptedServer::new(vec![sse_response(&[
        FRAMES[0],
        r#"{"type":"response.brand_new","sequence_number":1}"#,
        FRAMES[1],
    ])])
    .await;
    let client = client(&server);

    let mut events = client
        .stream(&ResponseRequest::new("hi").with_stream(true), None)
        .await
        .expect("stream");

    assert!(events.next().await);
    assert!(!events.next().await);
    assert_matches!(events.err(), Some(Error::Decode { .. }));
    assert!(!events.next().await);
}

#[tokio::test]
async fn cancellation_is_delivered_on_the_channel() {
    let server = ScriptedServer::new(vec![ScriptedResponse::Respond {
        status: 200,
        content_type: "text/event-stream",
        chunks: vec![
            ResponseChunk {
                delay_ms: 0,
                bytes: sse_frames(&FRAMES[..1]),
            },
            ResponseChunk {
                delay_ms: 5_000,
                bytes: sse_frames(&FRAMES[1..]),
            },
        ],
    }])
    .await;
    let client = client(&server);
    let cancel = cancel_signal();

    let mut events = client
        .stream(&ResponseRequest::new("hi").with_stream(true), Some(cancel.clone()))
        .await
        .expect("stream");
    assert!(events.next().await);

    cancel.store(true, Ordering::Release);
    let advanced = timeout(Duration::from_secs(2), events.next())
        .await
        .expect("cancellation observed promptly");

    assert!(!advanced);
    assert_matches!(events.err(), Some(Error::Cancelled));
}

#[tokio::test]
async fn http_errors_fail_before_streaming() {
    let server = ScriptedServer::new(vec![support::json_response(
        429,
        r#"{"error":{"message":"slow down"}}"#,
    )])
    .await;
    let client = client(&server);

    let error = client
        .stream(&ResponseRequest::new("hi").with_stream(true), None)
        .await
        .expect_err("status error");
    assert_eq!(error.status().map(|status| status.as_u16()), Some(429));
}
