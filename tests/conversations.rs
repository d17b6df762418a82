#[path = "../crates/responses_api/tests/support/mod.rs"]
mod support;

use std::collections::BTreeMap;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;

use responses_kit::responses_api::items::{InputMessageContent, Role};
use responses_kit::{
    ApiConfig, Error, InputItem, ItemIncludes, ListItemsOptions, ListOrder, ResponsesClient,
    RetryPolicy,
};
use support::{json_response, ScriptedServer};

const CONVERSATION: &str =
    r#"{"id":"conv_1","object":"conversation","created_at":1741900000,"metadata":{"topic":"demo"}}"#;

fn client(server: &ScriptedServer) -> ResponsesClient {
    ResponsesClient::new(
        ApiConfig::new("sk-test")
            .with_base_url(&server.base_url)
            .with_retry(RetryPolicy::none()),
    )
    .expect("client")
}

#[tokio::test]
async fn create_update_and_delete() {
    let server = ScriptedServer::new(vec![
        json_response(200, CONVERSATION),
        json_response(
            200,
            r#"{"id":"conv_1","object":"conversation","created_at":1741900000,"metadata":{"topic":"renamed"}}"#,
        ),
        json_response(200, r#"{"id":"conv_1","object":"conversation.deleted","deleted":true}"#),
    ])
    .await;
    let client = client(&server);

    let metadata = BTreeMap::from([("topic".to_owned(), "demo".to_owned())]);
    let mut conversation = client
        .create_conversation(&metadata, &[InputItem::user_message("hello")], None)
        .await
        .expect("create");
    assert_eq!(conversation.id, "conv_1");
    assert_eq!(conversation.created_at, Some(1741900000));
    assert_eq!(conversation.metadata, metadata);
    assert!(conversation.is_ready());

    conversation
        .metadata
        .insert("topic".to_owned(), "renamed".to_owned());
    conversation.update(None).await.expect("update");
    assert_eq!(conversation.metadata["topic"], "renamed");

    conversation.delete(None).await.expect("delete");

    let requests = server.requests();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/v1/conversations");
    assert_eq!(
        requests[0].json(),
        json!({
            "metadata": {"topic": "demo"},
            "items": [{"type": "message", "role": "user", "content": "hello"}]
        })
    );
    assert_eq!(requests[1].method, "POST");
    assert_eq!(requests[1].path, "/v1/conversations/conv_1");
    assert_eq!(requests[1].json(), json!({"metadata": {"topic": "renamed"}}));
    assert_eq!(requests[2].method, "DELETE");
    assert_eq!(requests[2].path, "/v1/conversations/conv_1");
}

#[tokio::test]
async fn items_are_appended_listed_and_fetched() {
    let server = ScriptedServer::new(vec![
        json_response(200, CONVERSATION),
        json_response(
            200,
            r#"{"object":"list","data":[{"type":"message","id":"msg_1","role":"user","content":[{"type":"input_text","text":"hi"}]}],"first_id":"msg_1","last_id":"msg_1","has_more":false}"#,
        ),
        json_response(
            200,
            r#"{"object":"list","data":[
                {"type":"message","id":"msg_2","role":"assistant","content":[{"type":"output_text","text":"hello","annotations":[]}]},
                {"type":"message","id":"msg_1","role":"user","content":[{"type":"input_text","text":"hi"}]}
            ],"first_id":"msg_2","last_id":"msg_1","has_more":true}"#,
        ),
        json_response(
            200,
            r#"{"type":"function_call","id":"fc_1","call_id":"c1","name":"get_weather","arguments":"{}"}"#,
        ),
        json_response(200, CONVERSATION),
    ])
    .await;
    let client = client(&server);
    let conversation = client.conversation("conv_1", None).await.expect("fetch");

    let appended = conversation
        .append_items(
            &ItemIncludes {
                message_input_image_url: true,
                ..ItemIncludes::default()
            },
            &[InputItem::user_message("hi")],
            None,
        )
        .await
        .expect("append");
    assert_eq!(appended.items.len(), 1);
    assert_matches!(&appended.items[0], InputItem::Message(message) if message.role == Role::User);

    let page = conversation
        .list_items(
            &ListItemsOptions {
                limit: Some(2),
                order: Some(ListOrder::Desc),
                include: ItemIncludes {
                    reasoning_encrypted_content: true,
                    ..ItemIncludes::default()
                },
                ..ListItemsOptions::default()
            },
            None,
        )
        .await
        .expect("list");
    assert!(page.has_more);
    assert_eq!(page.first_id.as_deref(), Some("msg_2"));
    assert_matches!(
        &page.items[0],
        InputItem::Message(message) if message.role == Role::Assistant
            && matches!(message.content, InputMessageContent::Parts(_))
    );

    let item = conversation
        .item(&ItemIncludes::default(), "fc_1", None)
        .await
        .expect("item");
    assert_eq!(item.tag(), "function_call");

    conversation.delete_item("msg_1", None).await.expect("delete item");

    let requests = server.requests();
    assert_eq!(requests[0].path, "/v1/conversations/conv_1");
    assert_eq!(
        requests[1].path,
        "/v1/conversations/conv_1/items?include%5B%5D=message.input_image.image_url"
    );
    assert_eq!(
        requests[2].path,
        "/v1/conversations/conv_1/items?limit=2&order=desc&include%5B%5D=reasoning.encrypted_content"
    );
    assert_eq!(requests[3].path, "/v1/conversations/conv_1/items/fc_1");
    assert_eq!(requests[4].method, "DELETE");
    assert_eq!(requests[4].path, "/v1/conversations/conv_1/items/msg_1");
}

#[tokio::test]
async fn empty_append_is_rejected_without_a_request() {
    let server = ScriptedServer::new(vec![json_response(200, CONVERSATION)]).await;
    let client = client(&server);
    let conversation = client.conversation("conv_1", None).await.expect("fetch");

    let error = conversation
        .append_items(&ItemIncludes::default(), &[], None)
        .await
        .expect_err("empty");

    assert_matches!(error, Error::Validation(_));
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn handles_without_id_are_not_ready() {
    let server = ScriptedServer::new(vec![json_response(200, r#"{"id":"","object":"conversation"}"#)]).await;
    let client = client(&server);
    let conversation = client
        .create_conversation(&BTreeMap::new(), &[], None)
        .await
        .expect("create");

    assert!(!conversation.is_ready());
    assert_matches!(
        conversation.item(&ItemIncludes::default(), "msg_1", None).await,
        Err(Error::NotReady(_))
    );
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn listed_items_keep_requested_logprobs() {
    let stored = json!({
        "type": "message",
        "id": "msg_2",
        "status": "completed",
        "content": [{
            "type": "output_text",
            "text": "hello",
            "annotations": [],
            "logprobs": [{"token": "hello", "logprob": -0.5, "bytes": [104], "top_logprobs": []}]
        }]
    });
    let page = json!({
        "object": "list",
        "data": [stored.clone(), {"type": "message", "id": "msg_1", "role": "user", "content": "hi"}],
        "first_id": "msg_2",
        "last_id": "msg_1",
        "has_more": false
    });
    let server = ScriptedServer::new(vec![
        json_response(200, CONVERSATION),
        json_response(200, &page.to_string()),
    ])
    .await;
    let client = client(&server);
    let conversation = client.conversation("conv_1", None).await.expect("fetch");

    let listed = conversation
        .list_items(
            &ListItemsOptions {
                include: ItemIncludes {
                    message_output_text_logprobs: true,
                    ..ItemIncludes::default()
                },
                ..ListItemsOptions::default()
            },
            None,
        )
        .await
        .expect("list");

    assert_eq!(listed.items.len(), 2);
    assert_matches!(&listed.items[0], InputItem::Message(message) if message.role == Role::Assistant);
    let reencoded = serde_json::to_value(&listed.items[0]).expect("encode");
    assert_eq!(reencoded["content"], stored["content"]);
    assert_eq!(
        server.requests()[1].path,
        "/v1/conversations/conv_1/items?include%5B%5D=message.output_text.logprobs"
    );
}
