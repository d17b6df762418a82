//! Wire layer for the Responses API.
//!
//! Owns configuration, headers, URL normalization, retry and cancellation,
//! the HTTP transport, the tagged-union content codec, server envelopes, and
//! SSE framing with typed stream events. Orchestration lives one layer up.

pub mod cancel;
pub mod config;
pub mod envelope;
pub mod error;
pub mod events;
pub mod headers;
pub mod items;
pub mod retry;
pub mod sse;
pub mod transport;
pub mod url;

pub use cancel::{cancel_signal, CancelSignal};
pub use config::ApiConfig;
pub use envelope::{ConversationObject, ItemList, ResponseObject, ResponseStatus, Usage};
pub use error::ApiError;
pub use events::{decode_event, StreamEvent, StreamEventKind};
pub use items::{InputContent, InputItem, OutputItem, RawItem};
pub use retry::{AcceptStatus, RetryPolicy};
pub use sse::SseStreamParser;
pub use transport::{ApiRequest, ApiResponse, Transport};
pub use url::normalize_base_url;
