#[path = "../crates/responses_api/tests/support/mod.rs"]
mod support;

use std::sync::atomic::Ordering;
use std::time::Instant;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use tokio::time::{sleep, timeout, Duration};

use responses_kit::responses_api::ResponseStatus;
use responses_kit::{
    cancel_signal, ApiConfig, ClientOptions, Error, ResponseRequest, ResponsesClient, RetryPolicy,
};
use support::{json_response, ScriptedServer};

const COMPLETED: &str = r#"{"status":"completed","output":[{"type":"message","content":[{"type":"output_text","text":"done"}]}]}"#;

fn client(server: &ScriptedServer) -> ResponsesClient {
    ResponsesClient::with_options(
        ApiConfig::new("sk-test")
            .with_base_url(&server.base_url)
            .with_retry(RetryPolicy::none()),
        ClientOptions::default().with_poll_interval(Duration::from_millis(50)),
    )
    .expect("client")
}

#[tokio::test]
async fn background_create_then_poll() {
    let server = ScriptedServer::new(vec![
        json_response(202, r#"{"id":"r1","status":"queued"}"#),
        json_response(200, r#"{"status":"in_progress"}"#),
        json_response(200, COMPLETED),
    ])
    .await;
    let client = client(&server);

    let accepted = client
        .create_response(ResponseRequest::new("write a poem").with_background(true), None)
        .await
        .expect("accepted");
    assert_eq!(accepted.id(), "r1");
    assert!(accepted.outputs().is_empty());
    assert_eq!(accepted.status(), Some(ResponseStatus::Queued));

    let response = client
        .poll(accepted.id(), Some(Duration::from_millis(50)), None)
        .await
        .expect("completed");

    assert_eq!(response.id(), "r1");
    assert_eq!(response.joined_texts(), "done");
    assert_eq!(response.status(), Some(ResponseStatus::Completed));

    let requests = server.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].json()["background"], true);
    assert_eq!(requests[1].method, "GET");
    assert_eq!(requests[1].path, "/v1/responses/r1");
    assert_eq!(requests[2].path, "/v1/responses/r1");
}

#[tokio::test]
async fn poll_uses_configured_interval_by_default() {
    let server = ScriptedServer::new(vec![
        json_response(200, r#"{"id":"r1","status":"queued"}"#),
        json_response(200, COMPLETED),
    ])
    .await;
    let client = client(&server);

    let started = Instant::now();
    let response = client.poll("r1", None, None).await.expect("completed");

    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(response.texts(), vec!["done"]);
    assert_eq!(server.request_count(), 2);
}

#[tokio::test]
async fn poll_settles_on_output_without_status() {
    let server = ScriptedServer::new(vec![
        json_response(200, r#"{"id":"r1"}"#),
        json_response(
            200,
            r#"{"id":"r1","output":[{"type":"message","content":[{"type":"output_text","text":"late"}]}]}"#,
        ),
    ])
    .await;
    let client = client(&server);

    let response = timeout(Duration::from_secs(2), client.poll("r1", None, None))
        .await
        .expect("bounded")
        .expect("settled");

    assert_eq!(response.status(), None);
    assert_eq!(response.joined_texts(), "late");
    assert_eq!(server.request_count(), 2);
}

#[tokio::test]
async fn failed_background_response_is_remote_error() {
    let server = ScriptedServer::new(vec![json_response(
        200,
        r#"{"id":"r1","status":"failed","error":{"code":"server_error","message":"model crashed"}}"#,
    )])
    .await;
    let client = client(&server);

    let error = client.poll("r1", None, None).await.expect_err("failed");
    assert_matches!(error, Error::Remote { code: Some(code), message, .. } if code == "server_error" && message == "model crashed");
}

#[tokio::test]
async fn cancelled_background_response_is_remote_error() {
    let server = ScriptedServer::new(vec![json_response(200, r#"{"id":"r1","status":"cancelled"}"#)]).await;
    let client = client(&server);

    let error = client.poll("r1", None, None).await.expect_err("cancelled");
    assert_matches!(error, Error::Remote { code: Some(code), .. } if code == "cancelled");
}

#[tokio::test]
async fn poll_stops_promptly_on_cancellation() {
    let server = ScriptedServer::new(vec![json_response(200, r#"{"id":"r1","status":"in_progress"}"#)]).await;
    let client = client(&server);
    let cancel = cancel_signal();

    let trigger = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            cancel.store(true, Ordering::Release);
        })
    };

    let result = timeout(
        Duration::from_secs(2),
        client.poll("r1", Some(Duration::from_secs(30)), Some(&cancel)),
    )
    .await
    .expect("cancellation ends the wait");
    trigger.await.expect("trigger task");

    assert_matches!(result, Err(Error::Cancelled));
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn poll_with_cancelled_signal_sends_nothing() {
    let server = ScriptedServer::new(Vec::new()).await;
    let client = client(&server);
    let cancel = cancel_signal();
    cancel.store(true, Ordering::Release);

    let result = client.poll("r1", None, Some(&cancel)).await;

    assert_matches!(result, Err(Error::Cancelled));
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn retrieve_cancel_and_delete_hit_their_endpoints() {
    let server = ScriptedServer::new(vec![
        json_response(200, r#"{"id":"r1","status":"in_progress","output":[]}"#),
        json_response(200, r#"{"id":"r1","status":"cancelled","output":[]}"#),
        json_response(200, r#"{"id":"r1","object":"response.deleted","deleted":true}"#),
    ])
    .await;
    let client = client(&server);

    let retrieved = client.retrieve_response("r1", None).await.expect("retrieve");
    assert_eq!(retrieved.status(), Some(ResponseStatus::InProgress));
    let cancelled = client.cancel_response("r1", None).await.expect("cancel");
    assert_eq!(cancelled.status(), Some(ResponseStatus::Cancelled));
    client.delete_response("r1", None).await.expect("delete");

    let requests = server.requests();
    let calls: Vec<(&str, &str)> = requests
        .iter()
        .map(|request| (request.method.as_str(), request.path.as_str()))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("GET", "/v1/responses/r1"),
            ("POST", "/v1/responses/r1/cancel"),
            ("DELETE", "/v1/responses/r1"),
        ]
    );
}
