//! Typed server-sent events emitted while a response streams.

use serde::Deserialize;
use serde_json::Value;

use crate::envelope::ResponseObject;
use crate::error::ApiError;
use crate::items::{OutputItem, RawItem};

/// One decoded `data:` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub sequence_number: u64,
    pub kind: StreamEventKind,
}

impl StreamEvent {
    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }

    /// Text fragment carried by any `*.delta` event.
    pub fn delta(&self) -> Option<&str> {
        match &self.kind {
            StreamEventKind::OutputTextDelta(event)
            | StreamEventKind::RefusalDelta(event)
            | StreamEventKind::FunctionCallArgumentsDelta(event)
            | StreamEventKind::CustomToolCallInputDelta(event)
            | StreamEventKind::ReasoningSummaryTextDelta(event)
            | StreamEventKind::ReasoningTextDelta(event)
            | StreamEventKind::CodeInterpreterCallCodeDelta(event)
            | StreamEventKind::McpCallArgumentsDelta(event) => Some(&event.delta),
            _ => None,
        }
    }

    /// Response snapshot carried by lifecycle events.
    pub fn response(&self) -> Option<&ResponseObject> {
        match &self.kind {
            StreamEventKind::ResponseCreated(event)
            | StreamEventKind::ResponseQueued(event)
            | StreamEventKind::ResponseInProgress(event)
            | StreamEventKind::ResponseCompleted(event)
            | StreamEventKind::ResponseFailed(event)
            | StreamEventKind::ResponseIncomplete(event) => Some(&event.response),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct EventHeader {
    #[serde(rename = "type")]
    tag: Option<String>,
    #[serde(default)]
    sequence_number: u64,
}

/// Decodes one `data:` payload: the tag is peeked first, then the matching
/// payload parser runs. Unknown tags are errors.
pub fn decode_event(data: &str) -> Result<StreamEvent, ApiError> {
    let header: EventHeader =
        serde_json::from_str(data).map_err(|error| ApiError::decode("stream event", error))?;
    let tag = header
        .tag
        .filter(|tag| !tag.is_empty())
        .ok_or_else(|| ApiError::MalformedSse("event payload has no type".to_owned()))?;

    Ok(StreamEvent {
        sequence_number: header.sequence_number,
        kind: StreamEventKind::decode(&tag, data)?,
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseEvent {
    pub response: ResponseObject,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputItemEvent {
    #[serde(default)]
    pub output_index: u32,
    pub item: RawItem,
}

impl OutputItemEvent {
    pub fn parsed(&self) -> Result<OutputItem, ApiError> {
        OutputItem::from_raw(&self.item)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PartEvent {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub output_index: u32,
    #[serde(default)]
    pub content_index: Option<u32>,
    #[serde(default)]
    pub summary_index: Option<u32>,
    #[serde(default)]
    pub part: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeltaEvent {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub output_index: u32,
    #[serde(default)]
    pub content_index: Option<u32>,
    #[serde(default)]
    pub summary_index: Option<u32>,
    pub delta: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextDoneEvent {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub output_index: u32,
    #[serde(default)]
    pub content_index: Option<u32>,
    #[serde(default)]
    pub summary_index: Option<u32>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnnotationEvent {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub output_index: u32,
    #[serde(default)]
    pub content_index: u32,
    #[serde(default)]
    pub annotation_index: u32,
    pub annotation: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefusalDoneEvent {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub output_index: u32,
    #[serde(default)]
    pub content_index: u32,
    pub refusal: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArgumentsDoneEvent {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub output_index: u32,
    #[serde(default)]
    pub name: Option<String>,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InputDoneEvent {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub output_index: u32,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CodeDoneEvent {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub output_index: u32,
    pub code: String,
}

/// Progress marker for hosted tool calls.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ItemProgressEvent {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub output_index: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorEvent {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub param: Option<String>,
}

macro_rules! stream_event_kinds {
    ($($tag:literal => $variant:ident($payload:ty),)+) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum StreamEventKind {
            $($variant($payload),)+
        }

        impl StreamEventKind {
            pub const TAGS: &'static [&'static str] = &[$($tag,)+];

            pub fn tag(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => $tag,)+
                }
            }

            fn decode(tag: &str, data: &str) -> Result<Self, ApiError> {
                match tag {
                    $($tag => serde_json::from_str::<$payload>(data)
                        .map(Self::$variant)
                        .map_err(|error| ApiError::decode("stream event", error)),)+
                    other => Err(ApiError::UnknownEvent(other.to_owned())),
                }
            }
        }
    };
}

stream_event_kinds! {
    "response.created" => ResponseCreated(Box<ResponseEvent>),
    "response.queued" => ResponseQueued(Box<ResponseEvent>),
    "response.in_progress" => ResponseInProgress(Box<ResponseEvent>),
    "response.completed" => ResponseCompleted(Box<ResponseEvent>),
    "response.failed" => ResponseFailed(Box<ResponseEvent>),
    "response.incomplete" => ResponseIncomplete(Box<ResponseEvent>),
    "response.output_item.added" => OutputItemAdded(OutputItemEvent),
    "response.output_item.done" => OutputItemDone(OutputItemEvent),
    "response.content_part.added" => ContentPartAdded(PartEvent),
    "response.content_part.done" => ContentPartDone(PartEvent),
    "response.output_text.delta" => OutputTextDelta(DeltaEvent),
    "response.output_text.done" => OutputTextDone(TextDoneEvent),
    "response.output_text.annotation.added" => OutputTextAnnotationAdded(AnnotationEvent),
    "response.refusal.delta" => RefusalDelta(DeltaEvent),
    "response.refusal.done" => RefusalDone(RefusalDoneEvent),
    "response.function_call_arguments.delta" => FunctionCallArgumentsDelta(DeltaEvent),
    "response.function_call_arguments.done" => FunctionCallArgumentsDone(ArgumentsDoneEvent),
    "response.custom_tool_call_input.delta" => CustomToolCallInputDelta(DeltaEvent),
    "response.custom_tool_call_input.done" => CustomToolCallInputDone(InputDoneEvent),
    "response.reasoning_summary_part.added" => ReasoningSummaryPartAdded(PartEvent),
    "response.reasoning_summary_part.done" => ReasoningSummaryPartDone(PartEvent),
    "response.reasoning_summary_text.delta" => ReasoningSummaryTextDelta(DeltaEvent),
    "response.reasoning_summary_text.done" => ReasoningSummaryTextDone(TextDoneEvent),
    "response.reasoning_text.delta" => ReasoningTextDelta(DeltaEvent),
    "response.reasoning_text.done" => ReasoningTextDone(TextDoneEvent),
    "response.file_search_call.in_progress" => FileSearchCallInProgress(ItemProgressEvent),
    "response.file_search_call.searching" => FileSearchCallSearching(ItemProgressEvent),
    "response.file_search_call.completed" => FileSearchCallCompleted(ItemProgressEvent),
    "response.web_search_call.in_progress" => WebSearchCallInProgress(ItemProgressEvent),
    "response.web_search_call.searching" => WebSearchCallSearching(ItemProgressEvent),
    "response.web_search_call.completed" => WebSearchCallCompleted(ItemProgressEvent),
    "response.code_interpreter_call.in_progress" => CodeInterpreterCallInProgress(ItemProgressEvent),
    "response.code_interpreter_call.interpreting" => CodeInterpreterCallInterpreting(ItemProgressEvent),
    "response.code_interpreter_call.completed" => CodeInterpreterCallCompleted(ItemProgressEvent),
    "response.code_interpreter_call_code.delta" => CodeInterpreterCallCodeDelta(DeltaEvent),
    "response.code_interpreter_call_code.done" => CodeInterpreterCallCodeDone(CodeDoneEvent),
    "response.mcp_call.in_progress" => McpCallInProgress(ItemProgressEvent),
    "response.mcp_call.completed" => McpCallCompleted(ItemProgressEvent),
    "response.mcp_call.failed" => McpCallFailed(ItemProgressEvent),
    "response.mcp_call_arguments.delta" => McpCallArgumentsDelta(DeltaEvent),
    "response.mcp_call_arguments.done" => McpCallArgumentsDone(ArgumentsDoneEvent),
    "response.mcp_list_tools.in_progress" => McpListToolsInProgress(ItemProgressEvent),
    "response.mcp_list_tools.completed" => McpListToolsCompleted(ItemProgressEvent),
    "response.mcp_list_tools.failed" => McpListToolsFailed(ItemProgressEvent),
    "error" => Error(ErrorEvent),
}
