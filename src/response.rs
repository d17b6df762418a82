//! Decoded responses and their convenience accessors.

use responses_api::items::{
    ApplyPatchCall, CustomToolCall, FunctionCall, McpApprovalRequest, OutputMessage, Reasoning,
    ShellCall,
};
use responses_api::{ApiResponse, OutputItem, RawItem, ResponseObject, ResponseStatus, Usage};

use crate::error::{Error, Result};

/// Result of a call: a single wire response, or the aggregate of every
/// round the tool-call loop ran.
///
/// Outputs are kept twice: verbatim as received and parsed. Both lists stay
/// index-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    id: String,
    status: Option<ResponseStatus>,
    usage: Option<Usage>,
    raw_outputs: Vec<RawItem>,
    outputs: Vec<OutputItem>,
    stopped_by: Option<String>,
}

impl Response {
    /// Decodes a response envelope. An embedded `error` object is a remote
    /// failure even when the HTTP status was a success.
    pub fn from_envelope(envelope: ResponseObject) -> Result<Self> {
        if let Some(error) = envelope.error {
            return Err(Error::remote(error.code, error.message));
        }

        let outputs = envelope
            .output
            .iter()
            .map(OutputItem::from_raw)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if let Some(usage) = &envelope.usage {
            tracing::debug!(
                response_id = %envelope.id,
                model = envelope.model.as_deref().unwrap_or("unknown"),
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                total_tokens = usage.total_tokens,
                "response usage"
            );
        }

        Ok(Self {
            id: envelope.id,
            status: envelope.status,
            usage: envelope.usage,
            raw_outputs: envelope.output,
            outputs,
            stopped_by: None,
        })
    }

    pub fn from_body(body: &ApiResponse) -> Result<Self> {
        Self::from_envelope(body.json("response")?)
    }

    /// Background acknowledgement: the id only, no outputs yet.
    pub(crate) fn accepted(id: String, status: Option<ResponseStatus>) -> Self {
        Self {
            id,
            status,
            ..Self::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> Option<ResponseStatus> {
        self.status
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    pub fn outputs(&self) -> &[OutputItem] {
        &self.outputs
    }

    /// Outputs exactly as the server sent them.
    pub fn raw_outputs(&self) -> &[RawItem] {
        &self.raw_outputs
    }

    /// Name of the tool whose executor ended the loop with
    /// [`responses_tools::ToolError::DoNotRespond`].
    pub fn stopped_by_tool(&self) -> Option<&str> {
        self.stopped_by.as_deref()
    }

    pub fn messages(&self) -> impl Iterator<Item = &OutputMessage> {
        self.outputs.iter().filter_map(|item| match item {
            OutputItem::Message(message) => Some(message),
            _ => None,
        })
    }

    pub fn texts(&self) -> Vec<&str> {
        self.messages().flat_map(OutputMessage::texts).collect()
    }

    pub fn joined_texts(&self) -> String {
        self.texts().join("\n")
    }

    pub fn first_text(&self) -> Option<&str> {
        self.texts().first().copied()
    }

    pub fn last_text(&self) -> Option<&str> {
        self.texts().last().copied()
    }

    pub fn refusals(&self) -> Vec<&str> {
        self.messages().flat_map(OutputMessage::refusals).collect()
    }

    pub fn function_calls(&self) -> Vec<&FunctionCall> {
        self.outputs
            .iter()
            .filter_map(|item| match item {
                OutputItem::FunctionCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    pub fn custom_tool_calls(&self) -> Vec<&CustomToolCall> {
        self.outputs
            .iter()
            .filter_map(|item| match item {
                OutputItem::CustomToolCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    pub fn reasonings(&self) -> Vec<&Reasoning> {
        self.outputs
            .iter()
            .filter_map(|item| match item {
                OutputItem::Reasoning(reasoning) => Some(reasoning),
                _ => None,
            })
            .collect()
    }

    pub fn reasoning_summaries(&self) -> Vec<&str> {
        self.reasonings()
            .into_iter()
            .flat_map(Reasoning::summary_texts)
            .collect()
    }

    pub fn joined_reasoning_summaries(&self) -> String {
        self.reasoning_summaries().join("\n")
    }

    pub fn mcp_approval_requests(&self) -> Vec<&McpApprovalRequest> {
        self.outputs
            .iter()
            .filter_map(|item| match item {
                OutputItem::McpApprovalRequest(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn shell_calls(&self) -> Vec<&ShellCall> {
        self.outputs
            .iter()
            .filter_map(|item| match item {
                OutputItem::ShellCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    pub fn apply_patch_calls(&self) -> Vec<&ApplyPatchCall> {
        self.outputs
            .iter()
            .filter_map(|item| match item {
                OutputItem::ApplyPatchCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    /// Moves the outputs out, paired verbatim/parsed.
    pub(crate) fn take_outputs(&mut self) -> Vec<(RawItem, OutputItem)> {
        let raw = std::mem::take(&mut self.raw_outputs);
        let parsed = std::mem::take(&mut self.outputs);
        raw.into_iter().zip(parsed).collect()
    }

    pub(crate) fn push_output(&mut self, raw: RawItem, item: OutputItem) {
        self.raw_outputs.push(raw);
        self.outputs.push(item);
    }

    /// Takes over `round`'s id and status and adds its token usage.
    pub(crate) fn adopt_round(&mut self, round: &Response) {
        self.id.clone_from(&round.id);
        self.status = round.status;
        match (&mut self.usage, &round.usage) {
            (Some(total), Some(usage)) => total.add(usage),
            (None, Some(usage)) => self.usage = Some(usage.clone()),
            _ => {}
        }
    }

    pub(crate) fn set_id_if_empty(&mut self, id: &str) {
        if self.id.is_empty() {
            self.id = id.to_owned();
        }
    }

    pub(crate) fn mark_stopped_by(&mut self, tool: impl Into<String>) {
        self.stopped_by = Some(tool.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn decode(body: &str) -> Result<Response> {
        let envelope: ResponseObject = serde_json::from_str(body).expect("envelope");
        Response::from_envelope(envelope)
    }

    #[test]
    fn plain_text_response() {
        let response = decode(
            r#"{"id":"r1","output":[{"type":"message","role":"assistant","content":[{"type":"output_text","text":"hello"}]}]}"#,
        )
        .expect("response");
        assert_eq!(response.id(), "r1");
        assert_eq!(response.joined_texts(), "hello");
        assert!(response.function_calls().is_empty());
        assert_eq!(response.raw_outputs().len(), response.outputs().len());
    }

    #[test]
    fn accessors_pick_their_item_kinds() {
        let response = decode(
            r#"{"id":"r1","output":[
                {"type":"reasoning","summary":[{"type":"summary_text","text":"think"},{"type":"summary_text","text":"more"}]},
                {"type":"message","content":[{"type":"output_text","text":"a"},{"type":"refusal","refusal":"no"}]},
                {"type":"message","content":"b"},
                {"type":"function_call","call_id":"c1","name":"f","arguments":"{}"},
                {"type":"custom_tool_call","call_id":"c2","name":"g","input":"x"},
                {"type":"mcp_approval_request","id":"a1","server_label":"s","name":"t","arguments":"{}"},
                {"type":"shell_call","call_id":"c3","action":{"commands":["ls"]}},
                {"type":"apply_patch_call","call_id":"c4","operation":{"type":"delete_file","path":"a.txt"}},
                {"type":"brand_new_item","payload":1}
            ]}"#,
        )
        .expect("response");

        assert_eq!(response.texts(), vec!["a", "b"]);
        assert_eq!(response.first_text(), Some("a"));
        assert_eq!(response.last_text(), Some("b"));
        assert_eq!(response.joined_texts(), "a\nb");
        assert_eq!(response.refusals(), vec!["no"]);
        assert_eq!(response.joined_reasoning_summaries(), "think\nmore");
        assert_eq!(response.function_calls()[0].call_id, "c1");
        assert_eq!(response.custom_tool_calls()[0].input, "x");
        assert_eq!(response.mcp_approval_requests()[0].id, "a1");
        assert_eq!(response.shell_calls()[0].call_id, "c3");
        assert_eq!(response.apply_patch_calls()[0].call_id, "c4");
        assert_matches!(response.outputs().last(), Some(OutputItem::Opaque(_)));
    }

    #[test]
    fn envelope_error_is_remote() {
        let error = decode(r#"{"id":"r1","error":{"code":"server_error","message":"boom"},"output":[]}"#)
            .expect_err("error");
        assert_matches!(error, Error::Remote { code: Some(code), message, .. } if code == "server_error" && message == "boom");
    }

    #[test]
    fn unsupported_nested_tag_fails_decode() {
        let error = decode(
            r#"{"id":"r1","output":[{"type":"code_interpreter_call","id":"ci","results":[{"type":"video"}]}]}"#,
        )
        .expect_err("closed union");
        assert_matches!(error, Error::UnsupportedTag { tag, .. } if tag == "video");
    }

    #[test]
    fn adopting_rounds_accumulates_usage() {
        let mut total = decode(r#"{"id":"r1","usage":{"input_tokens":2,"output_tokens":1,"total_tokens":3}}"#)
            .expect("first");
        let next = decode(r#"{"id":"r2","usage":{"input_tokens":5,"output_tokens":4,"total_tokens":9}}"#)
            .expect("second");
        total.adopt_round(&next);
        assert_eq!(total.id(), "r2");
        assert_eq!(total.usage().map(|usage| usage.total_tokens), Some(12));
    }
}
