use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::content::{Annotation, InputContent, OutputContent};
use super::input::{assistant_role, Role};
use super::{tagged, RawItem};
use crate::error::ApiError;

/// Item produced by the server. Also accepted back as input on later turns.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputItem {
    Message(OutputMessage),
    Reasoning(Reasoning),
    FileSearchCall(FileSearchCall),
    WebSearchCall(WebSearchCall),
    ComputerCall(ComputerCall),
    ComputerCallOutput(ComputerCallOutput),
    FunctionCall(FunctionCall),
    FunctionCallOutput(FunctionCallOutput),
    CustomToolCall(CustomToolCall),
    CustomToolCallOutput(CustomToolCallOutput),
    ApplyPatchCall(ApplyPatchCall),
    ApplyPatchCallOutput(ApplyPatchCallOutput),
    ShellCall(ShellCall),
    ShellCallOutput(ShellCallOutput),
    LocalShellCall(LocalShellCall),
    LocalShellCallOutput(LocalShellCallOutput),
    CodeInterpreterCall(CodeInterpreterCall),
    McpListTools(McpListTools),
    McpCall(McpCall),
    McpApprovalRequest(McpApprovalRequest),
    McpApprovalResponse(McpApprovalResponse),
    /// Tag unknown to this build, kept verbatim.
    Opaque(RawItem),
}

impl OutputItem {
    pub const TAGS: &'static [&'static str] = &[
        "message",
        "reasoning",
        "file_search_call",
        "web_search_call",
        "computer_call",
        "computer_call_output",
        "function_call",
        "function_call_output",
        "custom_tool_call",
        "custom_tool_call_output",
        "apply_patch_call",
        "apply_patch_call_output",
        "shell_call",
        "shell_call_output",
        "local_shell_call",
        "local_shell_call_output",
        "code_interpreter_call",
        "mcp_list_tools",
        "mcp_call",
        "mcp_approval_request",
        "mcp_approval_response",
    ];

    pub fn is_known_tag(tag: &str) -> bool {
        Self::TAGS.contains(&tag)
    }

    /// Runs the tag-specific parser over a stashed item.
    pub fn from_raw(raw: &RawItem) -> Result<Self, ApiError> {
        let tag = raw.tag();
        if !Self::is_known_tag(tag) {
            return Ok(Self::Opaque(raw.clone()));
        }

        let value: Value = raw.decode("output item")?;
        check_closed_unions(tag, &value)?;

        let item = match tag {
            "message" => Self::Message(typed(value)?),
            "reasoning" => Self::Reasoning(typed(value)?),
            "file_search_call" => Self::FileSearchCall(typed(value)?),
            "web_search_call" => Self::WebSearchCall(typed(value)?),
            "computer_call" => Self::ComputerCall(typed(value)?),
            "computer_call_output" => Self::ComputerCallOutput(typed(value)?),
            "function_call" => Self::FunctionCall(typed(value)?),
            "function_call_output" => Self::FunctionCallOutput(typed(value)?),
            "custom_tool_call" => Self::CustomToolCall(typed(value)?),
            "custom_tool_call_output" => Self::CustomToolCallOutput(typed(value)?),
            "apply_patch_call" => Self::ApplyPatchCall(typed(value)?),
            "apply_patch_call_output" => Self::ApplyPatchCallOutput(typed(value)?),
            "shell_call" => Self::ShellCall(typed(value)?),
            "shell_call_output" => Self::ShellCallOutput(typed(value)?),
            "local_shell_call" => Self::LocalShellCall(typed(value)?),
            "local_shell_call_output" => Self::LocalShellCallOutput(typed(value)?),
            "code_interpreter_call" => Self::CodeInterpreterCall(typed(value)?),
            "mcp_list_tools" => Self::McpListTools(typed(value)?),
            "mcp_call" => Self::McpCall(typed(value)?),
            "mcp_approval_request" => Self::McpApprovalRequest(typed(value)?),
            "mcp_approval_response" => Self::McpApprovalResponse(typed(value)?),
            _ => Self::Opaque(raw.clone()),
        };
        Ok(item)
    }

    pub fn from_json(json: &str) -> Result<Self, ApiError> {
        Self::from_raw(&RawItem::from_json(json)?)
    }

    pub fn to_raw(&self) -> Result<RawItem, ApiError> {
        match self {
            Self::Opaque(raw) => Ok(raw.clone()),
            item => RawItem::encode(item),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Message(_) => "message",
            Self::Reasoning(_) => "reasoning",
            Self::FileSearchCall(_) => "file_search_call",
            Self::WebSearchCall(_) => "web_search_call",
            Self::ComputerCall(_) => "computer_call",
            Self::ComputerCallOutput(_) => "computer_call_output",
            Self::FunctionCall(_) => "function_call",
            Self::FunctionCallOutput(_) => "function_call_output",
            Self::CustomToolCall(_) => "custom_tool_call",
            Self::CustomToolCallOutput(_) => "custom_tool_call_output",
            Self::ApplyPatchCall(_) => "apply_patch_call",
            Self::ApplyPatchCallOutput(_) => "apply_patch_call_output",
            Self::ShellCall(_) => "shell_call",
            Self::ShellCallOutput(_) => "shell_call_output",
            Self::LocalShellCall(_) => "local_shell_call",
            Self::LocalShellCallOutput(_) => "local_shell_call_output",
            Self::CodeInterpreterCall(_) => "code_interpreter_call",
            Self::McpListTools(_) => "mcp_list_tools",
            Self::McpCall(_) => "mcp_call",
            Self::McpApprovalRequest(_) => "mcp_approval_request",
            Self::McpApprovalResponse(_) => "mcp_approval_response",
            Self::Opaque(raw) => raw.tag(),
        }
    }
}

fn typed<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|error| ApiError::decode("output item", error))
}

fn check_closed_unions(tag: &str, value: &Value) -> Result<(), ApiError> {
    match tag {
        "message" => match value.get("content") {
            Some(Value::String(_)) => Ok(()),
            Some(Value::Array(parts)) if !parts.is_empty() => {
                for part in parts {
                    if check_member("message content", part, OutputContent::TAGS)? == "output_text"
                    {
                        check_list("annotation", part.get("annotations"), Annotation::TAGS)?;
                    }
                }
                Ok(())
            }
            _ => Err(ApiError::InvalidItem(
                "output message content must be a string or a non-empty list".to_owned(),
            )),
        },
        "reasoning" => check_list("reasoning summary", value.get("summary"), &["summary_text"]),
        "code_interpreter_call" => check_list(
            "code interpreter result",
            value.get("results"),
            CodeInterpreterResult::TAGS,
        ),
        _ => Ok(()),
    }
}

fn check_list(
    parent: &'static str,
    list: Option<&Value>,
    allowed: &[&str],
) -> Result<(), ApiError> {
    let Some(Value::Array(entries)) = list else {
        return Ok(());
    };
    for entry in entries {
        check_member(parent, entry, allowed)?;
    }
    Ok(())
}

fn check_member<'a>(
    parent: &'static str,
    entry: &'a Value,
    allowed: &[&str],
) -> Result<&'a str, ApiError> {
    let tag = entry.get("type").and_then(Value::as_str).unwrap_or_default();
    if allowed.contains(&tag) {
        Ok(tag)
    } else {
        Err(ApiError::unsupported_tag(parent, tag))
    }
}

impl Serialize for OutputItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Message(item) => tagged(serializer, "message", item),
            Self::Reasoning(item) => tagged(serializer, "reasoning", item),
            Self::FileSearchCall(item) => tagged(serializer, "file_search_call", item),
            Self::WebSearchCall(item) => tagged(serializer, "web_search_call", item),
            Self::ComputerCall(item) => tagged(serializer, "computer_call", item),
            Self::ComputerCallOutput(item) => tagged(serializer, "computer_call_output", item),
            Self::FunctionCall(item) => tagged(serializer, "function_call", item),
            Self::FunctionCallOutput(item) => tagged(serializer, "function_call_output", item),
            Self::CustomToolCall(item) => tagged(serializer, "custom_tool_call", item),
            Self::CustomToolCallOutput(item) => {
                tagged(serializer, "custom_tool_call_output", item)
            }
            Self::ApplyPatchCall(item) => tagged(serializer, "apply_patch_call", item),
            Self::ApplyPatchCallOutput(item) => {
                tagged(serializer, "apply_patch_call_output", item)
            }
            Self::ShellCall(item) => tagged(serializer, "shell_call", item),
            Self::ShellCallOutput(item) => tagged(serializer, "shell_call_output", item),
            Self::LocalShellCall(item) => tagged(serializer, "local_shell_call", item),
            Self::LocalShellCallOutput(item) => {
                tagged(serializer, "local_shell_call_output", item)
            }
            Self::CodeInterpreterCall(item) => tagged(serializer, "code_interpreter_call", item),
            Self::McpListTools(item) => tagged(serializer, "mcp_list_tools", item),
            Self::McpCall(item) => tagged(serializer, "mcp_call", item),
            Self::McpApprovalRequest(item) => tagged(serializer, "mcp_approval_request", item),
            Self::McpApprovalResponse(item) => tagged(serializer, "mcp_approval_response", item),
            Self::Opaque(raw) => raw.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for OutputItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawItem::deserialize(deserializer)?;
        Self::from_raw(&raw).map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default = "assistant_role")]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub content: OutputMessageContent,
}

impl OutputMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            id: None,
            role: Role::Assistant,
            status: None,
            content: OutputMessageContent::Parts(vec![OutputContent::text(text)]),
        }
    }

    pub fn texts(&self) -> Vec<&str> {
        match &self.content {
            OutputMessageContent::Text(text) => vec![text.as_str()],
            OutputMessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    OutputContent::OutputText { text, .. } => Some(text.as_str()),
                    OutputContent::Refusal { .. } => None,
                })
                .collect(),
        }
    }

    pub fn refusals(&self) -> Vec<&str> {
        match &self.content {
            OutputMessageContent::Text(_) => Vec::new(),
            OutputMessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    OutputContent::Refusal { refusal } => Some(refusal.as_str()),
                    OutputContent::OutputText { .. } => None,
                })
                .collect(),
        }
    }
}

/// A string, or a non-empty list of parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputMessageContent {
    Text(String),
    Parts(Vec<OutputContent>),
}

impl<'de> Deserialize<'de> for OutputMessageContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Array(parts) if !parts.is_empty() => {
                serde_json::from_value(Value::Array(parts))
                    .map(Self::Parts)
                    .map_err(D::Error::custom)
            }
            _ => Err(D::Error::custom(
                "output message content must be a string or a non-empty list",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReasoningSummary {
    SummaryText { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reasoning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub summary: Vec<ReasoningSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Reasoning {
    pub fn summary_texts(&self) -> impl Iterator<Item = &str> {
        self.summary.iter().map(|part| match part {
            ReasoningSummary::SummaryText { text } => text.as_str(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSearchResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSearchCall {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub queries: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<FileSearchResult>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchCall {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyCheck {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputerCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub action: Value,
    #[serde(default)]
    pub pending_safety_checks: Vec<SafetyCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputerCallOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_safety_checks: Option<Vec<SafetyCheck>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub name: String,
    /// JSON-encoded arguments, passed to the executor untouched.
    pub arguments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Tool output body: plain text or a list of content parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutputPayload {
    Text(String),
    Parts(Vec<InputContent>),
}

impl From<String> for ToolOutputPayload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for ToolOutputPayload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub output: ToolOutputPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl FunctionCallOutput {
    pub fn new(call_id: impl Into<String>, output: impl Into<ToolOutputPayload>) -> Self {
        Self {
            id: None,
            call_id: call_id.into(),
            output: output.into(),
            status: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub name: String,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomToolCallOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub output: ToolOutputPayload,
}

impl CustomToolCallOutput {
    pub fn new(call_id: impl Into<String>, output: impl Into<ToolOutputPayload>) -> Self {
        Self {
            id: None,
            call_id: call_id.into(),
            output: output.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyPatchCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub operation: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyPatchCallOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub action: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellCallOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_length: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalShellCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub action: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Output of a local shell call; `id` is the call's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalShellCallOutput {
    pub id: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeInterpreterFile {
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CodeInterpreterResult {
    Logs { logs: String },
    Files { files: Vec<CodeInterpreterFile> },
}

impl CodeInterpreterResult {
    pub const TAGS: &'static [&'static str] = &["logs", "files"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeInterpreterCall {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub results: Vec<CodeInterpreterResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpListTools {
    pub id: String,
    pub server_label: String,
    #[serde(default)]
    pub tools: Vec<McpToolInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpCall {
    pub id: String,
    pub server_label: String,
    pub name: String,
    pub arguments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpApprovalRequest {
    pub id: String,
    pub server_label: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpApprovalResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub approval_request_id: String,
    pub approve: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl McpApprovalResponse {
    pub fn new(approval_request_id: impl Into<String>, approve: bool) -> Self {
        Self {
            id: None,
            approval_request_id: approval_request_id.into(),
            approve,
            reason: None,
        }
    }
}
