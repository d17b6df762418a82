//! Client for LLM Responses APIs.
//!
//! [`ResponsesClient`] owns a transport, a tool registry and options. A call
//! goes through four steps:
//! - the request is assembled, resolving tool names against the registry;
//! - the response is decoded into typed output items;
//! - registered tools run and their outputs are sent back until the model
//!   stops calling them;
//! - the rounds are folded into one aggregate [`Response`].
//!
//! Streaming ([`ResponsesClient::stream`]), background polling
//! ([`ResponsesClient::poll`]) and server-side conversations
//! ([`Conversation`]) sit next to that loop.
//!
//! The wire layer lives in `responses_api` and the tool registry in
//! `responses_tools`; both are re-exported.

pub mod config;
pub mod conversation;
pub mod error;
pub mod request;
pub mod response;
pub mod stream;

mod client;
mod orchestrator;
mod poller;

pub use responses_api;
pub use responses_tools;

pub use client::ResponsesClient;
pub use config::ClientOptions;
pub use conversation::{
    Conversation, ConversationItems, ItemIncludes, ListItemsOptions, ListOrder,
};
pub use error::{Error, Result};
pub use request::{
    force_function, force_tool_choice, Input, IntermediateMessageHandler, ReasoningEffort,
    ReasoningOptions, ResponseRequest, TextFormat, ToolChoice, Truncation,
};
pub use response::Response;
pub use stream::EventStream;

pub use responses_api::{
    cancel_signal, ApiConfig, CancelSignal, InputContent, InputItem, OutputItem, RetryPolicy,
    StreamEvent, StreamEventKind,
};
pub use responses_tools::{Function, Tool, ToolError, ToolKind, ToolRegistry};
