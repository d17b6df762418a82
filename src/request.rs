//! Caller-facing request options and their assembly into the wire body.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use responses_api::items::OutputMessage;
use responses_api::InputItem;
use responses_tools::{Tool, ToolKind, ToolRegistry};

use crate::error::{Error, Result};

/// Callback for assistant messages that arrive alongside tool calls, before
/// the follow-up round completes.
pub type IntermediateMessageHandler = Arc<dyn Fn(&OutputMessage) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Text(String),
    Items(Vec<InputItem>),
}

impl Default for Input {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl Input {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Items(items) => items.is_empty(),
        }
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<InputItem>> for Input {
    fn from(value: Vec<InputItem>) -> Self {
        Self::Items(value)
    }
}

impl Serialize for Input {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::Items(items) => items.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    None,
    Required,
    /// Forces one tool. `name` is the function or custom tool name, or the
    /// server label for `mcp`; builtins ignore it.
    Tool {
        kind: ToolKind,
        name: Option<String>,
    },
}

impl ToolChoice {
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Auto => json!("auto"),
            Self::None => json!("none"),
            Self::Required => json!("required"),
            Self::Tool { kind, name } => match (kind, name) {
                (ToolKind::Function | ToolKind::Custom, Some(name)) => {
                    json!({"type": kind.as_str(), "name": name})
                }
                (ToolKind::Mcp, Some(label)) => {
                    json!({"type": "mcp", "server_label": label})
                }
                _ => json!({"type": kind.as_str()}),
            },
        }
    }
}

impl Serialize for ToolChoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

/// Tool choice forcing the tool of `kind` named `name`.
pub fn force_tool_choice(kind: ToolKind, name: impl Into<String>) -> ToolChoice {
    let name = name.into();
    ToolChoice::Tool {
        kind,
        name: (!name.is_empty()).then_some(name),
    }
}

pub fn force_function(name: impl Into<String>) -> ToolChoice {
    force_tool_choice(ToolKind::Function, name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReasoningOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<ReasoningEffort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Shape of the model's text output.
#[derive(Debug, Clone, PartialEq)]
pub enum TextFormat {
    Text,
    JsonObject,
    JsonSchema {
        name: String,
        schema: Value,
        description: Option<String>,
        strict: Option<bool>,
    },
}

impl TextFormat {
    pub fn json_schema(name: impl Into<String>, schema: Value) -> Self {
        Self::JsonSchema {
            name: name.into(),
            schema,
            description: None,
            strict: Some(true),
        }
    }

    pub fn to_wire(&self) -> Value {
        let format = match self {
            Self::Text => json!({"type": "text"}),
            Self::JsonObject => json!({"type": "json_object"}),
            Self::JsonSchema {
                name,
                schema,
                description,
                strict,
            } => {
                let mut format = json!({"type": "json_schema", "name": name, "schema": schema});
                if let Some(description) = description {
                    format["description"] = json!(description);
                }
                if let Some(strict) = strict {
                    format["strict"] = json!(strict);
                }
                format
            }
        };
        json!({ "format": format })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Truncation {
    Auto,
    Disabled,
}

/// Options for one `create response` call.
///
/// `tools` holds names: builtin tool types, registered tools, or registered
/// functions, resolved in that order when the request is assembled.
#[derive(Clone, Default)]
pub struct ResponseRequest {
    pub model: String,
    pub input: Input,
    pub instructions: Option<String>,
    pub tools: Vec<String>,
    pub tool_choice: Option<ToolChoice>,
    pub parallel_tool_calls: Option<bool>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_output_tokens: Option<u64>,
    pub reasoning: Option<ReasoningOptions>,
    pub text: Option<TextFormat>,
    pub truncation: Option<Truncation>,
    pub store: Option<bool>,
    pub stream: bool,
    pub background: bool,
    pub previous_response_id: Option<String>,
    pub conversation: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub include: Vec<String>,
    /// Hand tool calls back to the caller instead of executing them.
    pub return_tool_calls: bool,
    pub intermediate_message_handler: Option<IntermediateMessageHandler>,
}

impl fmt::Debug for ResponseRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseRequest")
            .field("model", &self.model)
            .field("input", &self.input)
            .field("instructions", &self.instructions)
            .field("tools", &self.tools)
            .field("tool_choice", &self.tool_choice)
            .field("stream", &self.stream)
            .field("background", &self.background)
            .field("previous_response_id", &self.previous_response_id)
            .field("conversation", &self.conversation)
            .field("return_tool_calls", &self.return_tool_calls)
            .field(
                "intermediate_message_handler",
                &self.intermediate_message_handler.is_some(),
            )
            .finish_non_exhaustive()
    }
}

impl ResponseRequest {
    pub fn new(input: impl Into<Input>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_tool(mut self, name: impl Into<String>) -> Self {
        self.tools.push(name.into());
        self
    }

    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    pub fn with_text_format(mut self, format: TextFormat) -> Self {
        self.text = Some(format);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    pub fn with_previous_response_id(mut self, id: impl Into<String>) -> Self {
        self.previous_response_id = Some(id.into());
        self
    }

    pub fn with_conversation(mut self, id: impl Into<String>) -> Self {
        self.conversation = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_return_tool_calls(mut self, enabled: bool) -> Self {
        self.return_tool_calls = enabled;
        self
    }

    pub fn with_intermediate_message_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&OutputMessage) + Send + Sync + 'static,
    {
        self.intermediate_message_handler = Some(Arc::new(handler));
        self
    }

    /// Resolves tool names against `registry` and builds the wire body.
    ///
    /// `stream` is the entry point's mode and is written as-is; callers check
    /// it against [`ResponseRequest::stream`] first.
    pub fn assemble<'a>(
        &'a self,
        registry: &ToolRegistry,
        default_model: &'a str,
        stream: bool,
    ) -> Result<WireRequest<'a>> {
        if self.input.is_empty() {
            return Err(Error::Validation("input is required".to_owned()));
        }

        let model = if self.model.is_empty() {
            default_model
        } else {
            self.model.as_str()
        };

        let tools = self
            .tools
            .iter()
            .map(|name| resolve_tool(registry, name))
            .collect::<Result<Vec<_>>>()?;

        Ok(WireRequest {
            model,
            input: &self.input,
            instructions: self.instructions.as_deref(),
            tools,
            tool_choice: self.tool_choice.as_ref(),
            parallel_tool_calls: self.parallel_tool_calls,
            temperature: self.temperature,
            top_p: self.top_p,
            max_output_tokens: self.max_output_tokens,
            reasoning: self.reasoning.as_ref(),
            text: self.text.as_ref().map(TextFormat::to_wire),
            truncation: self.truncation,
            store: self.store,
            stream,
            background: self.background,
            previous_response_id: self.previous_response_id.as_deref(),
            conversation: self.conversation.as_deref(),
            metadata: &self.metadata,
            include: &self.include,
        })
    }
}

/// Builtin type, then registered tool, then registered function.
fn resolve_tool(registry: &ToolRegistry, name: &str) -> Result<Value> {
    if let Some(tool) = ToolKind::parse(name)
        .filter(ToolKind::is_builtin)
        .and_then(Tool::builtin)
    {
        return Ok(tool.to_wire());
    }
    if let Some(tool) = registry.get_tool(name) {
        return Ok(tool.to_wire());
    }
    if let Some(function) = registry.get_function(name) {
        return Ok(function.to_wire());
    }
    Err(Error::UnknownTool(name.to_owned()))
}

/// Body of `POST /responses`.
#[derive(Debug, Serialize)]
pub struct WireRequest<'a> {
    pub model: &'a str,
    pub input: &'a Input,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'a ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<&'a ReasoningOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation: Option<Truncation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<bool>,
    #[serde(skip_serializing_if = "is_false")]
    pub stream: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub background: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation: Option<&'a str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: &'a Vec<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}
