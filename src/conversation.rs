//! Server-side conversations and their items.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use responses_api::cancel::CancelSignal;
use responses_api::envelope::Deleted;
use responses_api::url::paths;
use responses_api::{
    AcceptStatus, ApiRequest, ConversationObject, InputItem, ItemList, RawItem, Transport,
};

use crate::error::{Error, Result};

/// Optional data the server should embed in returned items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemIncludes {
    pub code_interpreter_call_outputs: bool,
    pub computer_call_output_image_url: bool,
    pub file_search_call_results: bool,
    pub message_input_image_url: bool,
    pub message_output_text_logprobs: bool,
    pub reasoning_encrypted_content: bool,
    pub web_search_call_action_sources: bool,
}

impl ItemIncludes {
    /// Values for the `include[]` query parameter.
    pub fn values(&self) -> Vec<&'static str> {
        [
            (self.code_interpreter_call_outputs, "code_interpreter_call.outputs"),
            (
                self.computer_call_output_image_url,
                "computer_call_output.output.image_url",
            ),
            (self.file_search_call_results, "file_search_call.results"),
            (self.message_input_image_url, "message.input_image.image_url"),
            (self.message_output_text_logprobs, "message.output_text.logprobs"),
            (self.reasoning_encrypted_content, "reasoning.encrypted_content"),
            (self.web_search_call_action_sources, "web_search_call.action.sources"),
        ]
        .into_iter()
        .filter_map(|(enabled, value)| enabled.then_some(value))
        .collect()
    }

    fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        for value in self.values() {
            request = request.with_query("include[]", value);
        }
        request
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListOrder {
    Asc,
    #[default]
    Desc,
}

impl ListOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListItemsOptions {
    pub limit: Option<u32>,
    pub first_id: Option<String>,
    pub last_id: Option<String>,
    /// Cursor: list items after this id.
    pub after: Option<String>,
    pub order: Option<ListOrder>,
    pub include: ItemIncludes,
}

/// A page of conversation items, parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationItems {
    pub items: Vec<InputItem>,
    pub first_id: Option<String>,
    pub last_id: Option<String>,
    pub has_more: bool,
}

impl ConversationItems {
    fn from_list(list: ItemList) -> Result<Self> {
        let items = list
            .data
            .iter()
            .map(InputItem::from_raw)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            items,
            first_id: list.first_id,
            last_id: list.last_id,
            has_more: list.has_more,
        })
    }
}

#[derive(Serialize)]
struct CreateBody<'a> {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metadata: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "<[InputItem]>::is_empty")]
    items: &'a [InputItem],
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    metadata: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct AppendBody<'a> {
    items: &'a [InputItem],
}

/// Handle to a server-side conversation.
///
/// Handles returned by the client are bound to its transport. A handle built
/// by hand, or one whose id is empty, fails every operation with
/// [`Error::NotReady`].
#[derive(Clone, Default)]
pub struct Conversation {
    pub id: String,
    pub object: Option<String>,
    pub created_at: Option<i64>,
    pub metadata: BTreeMap<String, String>,
    transport: Option<Arc<Transport>>,
}

impl fmt::Debug for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversation")
            .field("id", &self.id)
            .field("object", &self.object)
            .field("created_at", &self.created_at)
            .field("metadata", &self.metadata)
            .field("bound", &self.transport.is_some())
            .finish()
    }
}

impl Conversation {
    pub(crate) async fn create(
        transport: Arc<Transport>,
        metadata: &BTreeMap<String, String>,
        items: &[InputItem],
        cancellation: Option<&CancelSignal>,
    ) -> Result<Self> {
        let request = ApiRequest::post(paths::CONVERSATIONS).with_json(&CreateBody { metadata, items })?;
        let body = transport.send_buffered(&request, cancellation).await?;
        let object: ConversationObject = body.json("conversation")?;
        Ok(Self::bound(object, transport))
    }

    pub(crate) async fn fetch(
        transport: Arc<Transport>,
        id: &str,
        cancellation: Option<&CancelSignal>,
    ) -> Result<Self> {
        if id.trim().is_empty() {
            return Err(Error::NotReady("conversation id is empty"));
        }
        let request = ApiRequest::get(paths::conversation(id));
        let body = transport.send_buffered(&request, cancellation).await?;
        let object: ConversationObject = body.json("conversation")?;
        Ok(Self::bound(object, transport))
    }

    fn bound(object: ConversationObject, transport: Arc<Transport>) -> Self {
        Self {
            id: object.id,
            object: object.object,
            created_at: object.created_at,
            metadata: object.metadata.unwrap_or_default(),
            transport: Some(transport),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready().is_ok()
    }

    fn ready(&self) -> Result<&Transport> {
        if self.id.trim().is_empty() {
            return Err(Error::NotReady("conversation id is empty"));
        }
        self.transport
            .as_deref()
            .ok_or(Error::NotReady("conversation is not bound to a client"))
    }

    /// Posts the current `metadata` and refreshes the handle from the reply.
    pub async fn update(&mut self, cancellation: Option<&CancelSignal>) -> Result<()> {
        let transport = self.ready()?;
        let request = ApiRequest::post(paths::conversation(&self.id)).with_json(&UpdateBody {
            metadata: &self.metadata,
        })?;
        let body = transport.send_buffered(&request, cancellation).await?;
        let object: ConversationObject = body.json("conversation")?;

        self.object = object.object.or(self.object.take());
        self.created_at = object.created_at.or(self.created_at);
        if let Some(metadata) = object.metadata {
            self.metadata = metadata;
        }
        Ok(())
    }

    pub async fn delete(&self, cancellation: Option<&CancelSignal>) -> Result<()> {
        let transport = self.ready()?;
        let request =
            ApiRequest::delete(paths::conversation(&self.id)).accepting(AcceptStatus::AnySuccess);
        let body = transport.send_buffered(&request, cancellation).await?;
        log_deleted(&body.body, "conversation deleted");
        Ok(())
    }

    /// Appends `items` and returns them as stored by the server.
    pub async fn append_items(
        &self,
        include: &ItemIncludes,
        items: &[InputItem],
        cancellation: Option<&CancelSignal>,
    ) -> Result<ConversationItems> {
        let transport = self.ready()?;
        if items.is_empty() {
            return Err(Error::Validation("at least one item is required".to_owned()));
        }
        let request = include.apply(
            ApiRequest::post(paths::conversation_items(&self.id)).with_json(&AppendBody { items })?,
        );
        let body = transport.send_buffered(&request, cancellation).await?;
        ConversationItems::from_list(body.json("conversation items")?)
    }

    pub async fn list_items(
        &self,
        options: &ListItemsOptions,
        cancellation: Option<&CancelSignal>,
    ) -> Result<ConversationItems> {
        let transport = self.ready()?;
        let mut request = ApiRequest::get(paths::conversation_items(&self.id));
        if let Some(limit) = options.limit {
            request = request.with_query("limit", limit.to_string());
        }
        if let Some(first_id) = &options.first_id {
            request = request.with_query("first_id", first_id);
        }
        if let Some(last_id) = &options.last_id {
            request = request.with_query("last_id", last_id);
        }
        if let Some(after) = &options.after {
            request = request.with_query("after", after);
        }
        if let Some(order) = options.order {
            request = request.with_query("order", order.as_str());
        }
        let request = options.include.apply(request);

        let body = transport.send_buffered(&request, cancellation).await?;
        ConversationItems::from_list(body.json("conversation items")?)
    }

    pub async fn item(
        &self,
        include: &ItemIncludes,
        item_id: &str,
        cancellation: Option<&CancelSignal>,
    ) -> Result<InputItem> {
        let transport = self.ready()?;
        require_item_id(item_id)?;
        let request = include.apply(ApiRequest::get(paths::conversation_item(&self.id, item_id)));
        let body = transport.send_buffered(&request, cancellation).await?;
        let raw: RawItem = body.json("conversation item")?;
        Ok(InputItem::from_raw(&raw)?)
    }

    pub async fn delete_item(&self, item_id: &str, cancellation: Option<&CancelSignal>) -> Result<()> {
        let transport = self.ready()?;
        require_item_id(item_id)?;
        let request = ApiRequest::delete(paths::conversation_item(&self.id, item_id))
            .accepting(AcceptStatus::AnySuccess);
        transport.send_buffered(&request, cancellation).await?;
        tracing::debug!(conversation_id = %self.id, item_id, "conversation item deleted");
        Ok(())
    }
}

fn require_item_id(item_id: &str) -> Result<()> {
    if item_id.trim().is_empty() {
        return Err(Error::Validation("item id is required".to_owned()));
    }
    Ok(())
}

fn log_deleted(body: &[u8], message: &'static str) {
    if let Ok(deleted) = serde_json::from_slice::<Deleted>(body) {
        tracing::debug!(id = %deleted.id, deleted = deleted.deleted, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn include_flags_map_to_query_values() {
        let include = ItemIncludes {
            file_search_call_results: true,
            reasoning_encrypted_content: true,
            ..ItemIncludes::default()
        };
        assert_eq!(
            include.values(),
            vec!["file_search_call.results", "reasoning.encrypted_content"]
        );
        assert!(ItemIncludes::default().values().is_empty());
    }

    #[tokio::test]
    async fn unbound_handles_are_not_ready() {
        let conversation = Conversation {
            id: "conv_1".to_owned(),
            ..Conversation::default()
        };
        assert!(!conversation.is_ready());
        assert_matches!(conversation.delete(None).await, Err(Error::NotReady(_)));
        assert_matches!(
            conversation
                .list_items(&ListItemsOptions::default(), None)
                .await,
            Err(Error::NotReady(_))
        );
    }
}
