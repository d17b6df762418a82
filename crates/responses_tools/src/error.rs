use thiserror::Error;

/// Failure reported by a local tool executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// The tool finished its work and no further model turn should follow.
    #[error("tool requested no further response")]
    DoNotRespond,

    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{kind} '{name}' is already registered")]
    AlreadyRegistered { kind: &'static str, name: String },

    #[error("invalid tool name '{0}': expected 1-64 characters of [A-Za-z0-9_-]")]
    InvalidName(String),

    #[error("invalid tool '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

impl RegistryError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.to_owned(),
            reason: reason.into(),
        }
    }
}
