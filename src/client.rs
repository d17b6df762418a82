use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use responses_api::cancel::CancelSignal;
use responses_api::{ApiConfig, InputItem, Transport};
use responses_tools::{Function, Tool, ToolRegistry};

use crate::config::ClientOptions;
use crate::conversation::Conversation;
use crate::error::Result;
use crate::request::ResponseRequest;
use crate::response::Response;
use crate::stream::EventStream;
use crate::{orchestrator, poller, stream};

pub(crate) struct ClientInner {
    pub(crate) transport: Arc<Transport>,
    pub(crate) registry: ToolRegistry,
    pub(crate) options: ClientOptions,
}

/// Entry point: one transport, one tool registry, one set of options.
///
/// Cloning is cheap and clones share all three.
#[derive(Clone)]
pub struct ResponsesClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for ResponsesClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponsesClient")
            .field("base_url", &self.inner.transport.base_url())
            .field("options", &self.inner.options)
            .field("functions", &self.inner.registry.count_functions())
            .field("tools", &self.inner.registry.count_tools())
            .finish()
    }
}

impl ResponsesClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        Self::with_options(config, ClientOptions::default())
    }

    /// Client configured from `OPENAI_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ApiConfig::from_env())
    }

    pub fn with_options(config: ApiConfig, options: ClientOptions) -> Result<Self> {
        let transport = Transport::new(config)?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                transport: Arc::new(transport),
                registry: ToolRegistry::new(),
                options,
            }),
        })
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.inner.registry
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    pub fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    pub fn create_function(&self, function: Function) -> Result<()> {
        Ok(self.inner.registry.create_function(function)?)
    }

    pub fn create_tool(&self, tool: Tool) -> Result<()> {
        Ok(self.inner.registry.create_tool(tool)?)
    }

    /// Runs `request` to completion, executing registered tools between
    /// rounds. Background requests return as soon as the server accepts them.
    pub async fn create_response(
        &self,
        request: ResponseRequest,
        cancellation: Option<&CancelSignal>,
    ) -> Result<Response> {
        orchestrator::create_response(&self.inner, request, cancellation).await
    }

    /// Streams `request`; it must have `stream` set.
    pub async fn stream(
        &self,
        request: &ResponseRequest,
        cancellation: Option<CancelSignal>,
    ) -> Result<EventStream> {
        stream::open(&self.inner, request, cancellation).await
    }

    /// Waits for a background response. `None` uses the configured interval.
    pub async fn poll(
        &self,
        id: &str,
        interval: Option<Duration>,
        cancellation: Option<&CancelSignal>,
    ) -> Result<Response> {
        let interval = interval.unwrap_or(self.inner.options.poll_interval);
        poller::poll(&self.inner.transport, id, interval, cancellation).await
    }

    pub async fn retrieve_response(
        &self,
        id: &str,
        cancellation: Option<&CancelSignal>,
    ) -> Result<Response> {
        poller::retrieve(&self.inner.transport, id, cancellation).await
    }

    pub async fn cancel_response(
        &self,
        id: &str,
        cancellation: Option<&CancelSignal>,
    ) -> Result<Response> {
        poller::cancel(&self.inner.transport, id, cancellation).await
    }

    pub async fn delete_response(&self, id: &str, cancellation: Option<&CancelSignal>) -> Result<()> {
        poller::delete(&self.inner.transport, id, cancellation).await
    }

    pub async fn create_conversation(
        &self,
        metadata: &BTreeMap<String, String>,
        items: &[InputItem],
        cancellation: Option<&CancelSignal>,
    ) -> Result<Conversation> {
        Conversation::create(Arc::clone(&self.inner.transport), metadata, items, cancellation).await
    }

    pub async fn conversation(
        &self,
        id: &str,
        cancellation: Option<&CancelSignal>,
    ) -> Result<Conversation> {
        Conversation::fetch(Arc::clone(&self.inner.transport), id, cancellation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn client() -> ResponsesClient {
        ResponsesClient::new(ApiConfig::new("test-key").with_base_url("http://127.0.0.1:9/v1"))
            .expect("client")
    }

    #[test]
    fn missing_key_is_a_config_error() {
        assert_matches!(ResponsesClient::new(ApiConfig::new("")), Err(Error::Config(_)));
    }

    #[test]
    fn clones_share_the_registry() {
        let client = client();
        let clone = client.clone();
        client
            .create_function(Function::new("f", json!({"type": "object"})))
            .expect("function");
        assert_eq!(clone.registry().count_functions(), 1);
        assert_matches!(
            clone.create_function(Function::new("f", json!({"type": "object"}))),
            Err(Error::Validation(_))
        );
    }

    #[tokio::test]
    async fn entry_points_reject_the_wrong_mode() {
        let client = client();
        let streaming = ResponseRequest::new("hi").with_stream(true);
        assert_matches!(
            client.create_response(streaming, None).await,
            Err(Error::ModeMismatch(_))
        );
        assert_matches!(
            client.stream(&ResponseRequest::new("hi"), None).await,
            Err(Error::ModeMismatch(_))
        );
    }

    #[tokio::test]
    async fn empty_ids_are_rejected_before_any_request() {
        let client = client();
        assert_matches!(client.poll("", None, None).await, Err(Error::Validation(_)));
        assert_matches!(client.conversation(" ", None).await, Err(Error::NotReady(_)));
    }
}
