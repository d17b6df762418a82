use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::error::{RegistryError, ToolError};

/// Local implementation of a tool: receives the call's arguments (JSON text
/// for functions, free-form input for custom tools) and returns its output.
pub type Executor = Arc<dyn Fn(&str) -> Result<String, ToolError> + Send + Sync>;

pub fn executor<F>(f: F) -> Executor
where
    F: Fn(&str) -> Result<String, ToolError> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Function,
    Custom,
    WebSearch,
    FileSearch,
    ComputerUsePreview,
    Mcp,
    LocalShell,
    CodeInterpreter,
    Shell,
    ApplyPatch,
}

impl ToolKind {
    pub const ALL: [ToolKind; 10] = [
        Self::Function,
        Self::Custom,
        Self::WebSearch,
        Self::FileSearch,
        Self::ComputerUsePreview,
        Self::Mcp,
        Self::LocalShell,
        Self::CodeInterpreter,
        Self::Shell,
        Self::ApplyPatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Custom => "custom",
            Self::WebSearch => "web_search",
            Self::FileSearch => "file_search",
            Self::ComputerUsePreview => "computer_use_preview",
            Self::Mcp => "mcp",
            Self::LocalShell => "local_shell",
            Self::CodeInterpreter => "code_interpreter",
            Self::Shell => "shell",
            Self::ApplyPatch => "apply_patch",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Hosted or client-side tools identified by their type alone.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Self::Function | Self::Custom)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn name_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("tool name regex must compile"))
}

pub fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name_regex().is_match(name) {
        Ok(())
    } else {
        Err(RegistryError::InvalidName(name.to_owned()))
    }
}

/// A callable function the model may request by name.
#[derive(Clone)]
pub struct Function {
    pub name: String,
    pub description: Option<String>,
    /// JSON schema of the arguments object.
    pub parameters: Value,
    pub strict: Option<bool>,
    pub executor: Option<Executor>,
}

impl Function {
    pub fn new(name: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters,
            strict: None,
            executor: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    pub fn with_executor<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        self.executor = Some(executor(f));
        self
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        validate_name(&self.name)?;
        if !self.parameters.is_object() {
            return Err(RegistryError::invalid(
                &self.name,
                "parameters must be a JSON schema object",
            ));
        }
        Ok(())
    }

    pub fn to_wire(&self) -> Value {
        let mut wire = Map::new();
        wire.insert("type".to_owned(), json!("function"));
        wire.insert("name".to_owned(), json!(self.name));
        if let Some(description) = &self.description {
            wire.insert("description".to_owned(), json!(description));
        }
        wire.insert("parameters".to_owned(), self.parameters.clone());
        if let Some(strict) = self.strict {
            wire.insert("strict".to_owned(), json!(strict));
        }
        Value::Object(wire)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("strict", &self.strict)
            .field("executor", &self.executor.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct McpServer {
    pub server_label: String,
    pub server_url: String,
    pub server_description: Option<String>,
    pub allowed_tools: Option<Vec<String>>,
    /// `"always"`, `"never"`, or a per-tool filter object.
    pub require_approval: Option<Value>,
    pub headers: BTreeMap<String, String>,
}

/// Kind-specific part of a tool descriptor.
#[derive(Debug, Clone)]
pub enum ToolSpec {
    Function(Function),
    Custom {
        description: Option<String>,
        format: Option<Value>,
    },
    WebSearch {
        search_context_size: Option<String>,
        user_location: Option<Value>,
    },
    FileSearch {
        vector_store_ids: Vec<String>,
        max_num_results: Option<u32>,
    },
    ComputerUsePreview {
        display_width: u32,
        display_height: u32,
        environment: String,
    },
    Mcp(McpServer),
    LocalShell,
    CodeInterpreter {
        container: Value,
    },
    Shell,
    ApplyPatch,
}

impl ToolSpec {
    pub fn kind(&self) -> ToolKind {
        match self {
            Self::Function(_) => ToolKind::Function,
            Self::Custom { .. } => ToolKind::Custom,
            Self::WebSearch { .. } => ToolKind::WebSearch,
            Self::FileSearch { .. } => ToolKind::FileSearch,
            Self::ComputerUsePreview { .. } => ToolKind::ComputerUsePreview,
            Self::Mcp(_) => ToolKind::Mcp,
            Self::LocalShell => ToolKind::LocalShell,
            Self::CodeInterpreter { .. } => ToolKind::CodeInterpreter,
            Self::Shell => ToolKind::Shell,
            Self::ApplyPatch => ToolKind::ApplyPatch,
        }
    }

    /// Descriptor for a builtin that needs no configuration, if any.
    pub fn builtin_default(kind: ToolKind) -> Option<Self> {
        match kind {
            ToolKind::WebSearch => Some(Self::WebSearch {
                search_context_size: None,
                user_location: None,
            }),
            ToolKind::LocalShell => Some(Self::LocalShell),
            ToolKind::CodeInterpreter => Some(Self::CodeInterpreter {
                container: json!({"type": "auto"}),
            }),
            ToolKind::Shell => Some(Self::Shell),
            ToolKind::ApplyPatch => Some(Self::ApplyPatch),
            ToolKind::Function
            | ToolKind::Custom
            | ToolKind::FileSearch
            | ToolKind::ComputerUsePreview
            | ToolKind::Mcp => None,
        }
    }
}

/// A registered tool: a name, its kind-specific descriptor, and for custom
/// tools an optional local executor.
#[derive(Clone)]
pub struct Tool {
    pub name: String,
    pub spec: ToolSpec,
    pub custom_executor: Option<Executor>,
}

impl Tool {
    pub fn new(name: impl Into<String>, spec: ToolSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            custom_executor: None,
        }
    }

    pub fn function(function: Function) -> Self {
        Self::new(function.name.clone(), ToolSpec::Function(function))
    }

    pub fn custom(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(
            name,
            ToolSpec::Custom {
                description: Some(description.into()),
                format: None,
            },
        )
    }

    /// Builtin tool named after its own type.
    pub fn builtin(kind: ToolKind) -> Option<Self> {
        ToolSpec::builtin_default(kind).map(|spec| Self::new(kind.as_str(), spec))
    }

    pub fn with_custom_executor<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        self.custom_executor = Some(executor(f));
        self
    }

    pub fn kind(&self) -> ToolKind {
        self.spec.kind()
    }

    /// Executor for calls addressed to this tool, by kind.
    pub fn executor(&self) -> Option<&Executor> {
        match &self.spec {
            ToolSpec::Function(function) => function.executor.as_ref(),
            ToolSpec::Custom { .. } => self.custom_executor.as_ref(),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        validate_name(&self.name)?;
        match &self.spec {
            ToolSpec::Function(function) => {
                function.validate()?;
                if function.name != self.name {
                    return Err(RegistryError::invalid(
                        &self.name,
                        format!("function is named '{}'", function.name),
                    ));
                }
            }
            ToolSpec::FileSearch {
                vector_store_ids, ..
            } if vector_store_ids.is_empty() => {
                return Err(RegistryError::invalid(
                    &self.name,
                    "file_search requires at least one vector store id",
                ));
            }
            ToolSpec::ComputerUsePreview {
                display_width,
                display_height,
                environment,
            } => {
                if *display_width == 0 || *display_height == 0 {
                    return Err(RegistryError::invalid(
                        &self.name,
                        "computer_use_preview requires display dimensions",
                    ));
                }
                if environment.trim().is_empty() {
                    return Err(RegistryError::invalid(
                        &self.name,
                        "computer_use_preview requires an environment",
                    ));
                }
            }
            ToolSpec::Mcp(server) => {
                if server.server_label.trim().is_empty() || server.server_url.trim().is_empty() {
                    return Err(RegistryError::invalid(
                        &self.name,
                        "mcp requires a server label and url",
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Wire descriptor placed in a request's `tools` list.
    pub fn to_wire(&self) -> Value {
        let mut wire = Map::new();
        let kind = self.kind();
        wire.insert("type".to_owned(), json!(kind.as_str()));

        match &self.spec {
            ToolSpec::Function(function) => return function.to_wire(),
            ToolSpec::Custom {
                description,
                format,
            } => {
                wire.insert("name".to_owned(), json!(self.name));
                insert_opt(&mut wire, "description", description.as_ref().map(|d| json!(d)));
                insert_opt(&mut wire, "format", format.clone());
            }
            ToolSpec::WebSearch {
                search_context_size,
                user_location,
            } => {
                insert_opt(
                    &mut wire,
                    "search_context_size",
                    search_context_size.as_ref().map(|size| json!(size)),
                );
                insert_opt(&mut wire, "user_location", user_location.clone());
            }
            ToolSpec::FileSearch {
                vector_store_ids,
                max_num_results,
            } => {
                wire.insert("vector_store_ids".to_owned(), json!(vector_store_ids));
                insert_opt(&mut wire, "max_num_results", max_num_results.map(|n| json!(n)));
            }
            ToolSpec::ComputerUsePreview {
                display_width,
                display_height,
                environment,
            } => {
                wire.insert("display_width".to_owned(), json!(display_width));
                wire.insert("display_height".to_owned(), json!(display_height));
                wire.insert("environment".to_owned(), json!(environment));
            }
            ToolSpec::Mcp(server) => {
                wire.insert("server_label".to_owned(), json!(server.server_label));
                wire.insert("server_url".to_owned(), json!(server.server_url));
                insert_opt(
                    &mut wire,
                    "server_description",
                    server.server_description.as_ref().map(|d| json!(d)),
                );
                insert_opt(
                    &mut wire,
                    "allowed_tools",
                    server.allowed_tools.as_ref().map(|tools| json!(tools)),
                );
                insert_opt(&mut wire, "require_approval", server.require_approval.clone());
                if !server.headers.is_empty() {
                    wire.insert("headers".to_owned(), json!(server.headers));
                }
            }
            ToolSpec::CodeInterpreter { container } => {
                wire.insert("container".to_owned(), container.clone());
            }
            ToolSpec::LocalShell | ToolSpec::Shell | ToolSpec::ApplyPatch => {}
        }

        Value::Object(wire)
    }
}

fn insert_opt(wire: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        wire.insert(key.to_owned(), value);
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("spec", &self.spec)
            .field("custom_executor", &self.custom_executor.is_some())
            .finish()
    }
}
