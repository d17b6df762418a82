use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use responses_api::ApiError;
use responses_tools::RegistryError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing credentials or an unusable base URL.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("{0}")]
    ModeMismatch(&'static str),

    #[error("request failed after {elapsed:?}: {source}")]
    Transport {
        elapsed: Duration,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status, or an `error` object inside a response.
    #[error("{}", remote_summary(*status, code.as_deref(), message, body))]
    Remote {
        status: Option<StatusCode>,
        code: Option<String>,
        message: String,
        body: String,
    },

    #[error("failed to decode {context}: {message}")]
    Decode {
        context: &'static str,
        message: String,
    },

    #[error("unsupported {parent} tag '{tag}'")]
    UnsupportedTag { parent: &'static str, tag: String },

    #[error("tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("operation was cancelled")]
    Cancelled,

    #[error("conversation handle is not ready: {0}")]
    NotReady(&'static str),
}

fn remote_summary(
    status: Option<StatusCode>,
    code: Option<&str>,
    message: &str,
    body: &str,
) -> String {
    let mut summary = match status {
        Some(status) => format!("HTTP {status}"),
        None => "remote error".to_owned(),
    };
    if let Some(code) = code {
        summary.push_str(&format!(" ({code})"));
    }
    summary.push_str(": ");
    summary.push_str(message);
    if !body.is_empty() && body != message {
        summary.push_str(&format!(" [body: {body}]"));
    }
    summary
}

impl Error {
    pub(crate) fn remote(code: Option<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            status: None,
            code,
            message: message.into(),
            body: String::new(),
        }
    }

    /// HTTP status for remote failures, when the failure came from one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Remote { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<ApiError> for Error {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::MissingApiKey => Self::Config("API key is required".to_owned()),
            ApiError::InvalidBaseUrl(message) => Self::Config(format!("invalid base URL: {message}")),
            ApiError::InvalidHeader(message) => Self::Config(message),
            ApiError::Transport { elapsed, source } => Self::Transport { elapsed, source },
            ApiError::Status {
                status,
                code,
                message,
                body,
            } => Self::Remote {
                status: Some(status),
                code,
                message,
                body,
            },
            ApiError::Decode { context, source } => Self::Decode {
                context,
                message: source.to_string(),
            },
            ApiError::UnsupportedTag { parent, tag } => Self::UnsupportedTag { parent, tag },
            ApiError::InvalidItem(message) => Self::Decode {
                context: "item",
                message,
            },
            ApiError::MalformedSse(message) => Self::Decode {
                context: "event stream",
                message,
            },
            ApiError::UnknownEvent(tag) => Self::Decode {
                context: "event stream",
                message: format!("unknown event type '{tag}'"),
            },
            ApiError::Cancelled => Self::Cancelled,
        }
    }
}

impl From<RegistryError> for Error {
    fn from(error: RegistryError) -> Self {
        Self::Validation(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_keep_status_and_body() {
        let error = Error::from(ApiError::Status {
            status: StatusCode::BAD_REQUEST,
            code: Some("model_not_found".to_owned()),
            message: "invalid model".to_owned(),
            body: r#"{"error":{"message":"invalid model","code":"model_not_found"}}"#.to_owned(),
        });
        assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST));
        let rendered = error.to_string();
        assert!(rendered.starts_with("HTTP 400 Bad Request (model_not_found): invalid model"));
        assert!(rendered.contains(r#""code":"model_not_found""#));
        assert_matches::assert_matches!(
            error,
            Error::Remote { code: Some(code), message, .. } if code == "model_not_found" && message == "invalid model"
        );
    }

    #[test]
    fn envelope_errors_have_no_status() {
        let error = Error::remote(Some("server_error".to_owned()), "boom");
        assert_eq!(error.status(), None);
        assert_eq!(error.to_string(), "remote error (server_error): boom");
    }

    #[test]
    fn registry_conflicts_are_validation_errors() {
        let error = Error::from(RegistryError::AlreadyRegistered {
            kind: "function",
            name: "f".to_owned(),
        });
        assert!(matches!(error, Error::Validation(message) if message.contains("already registered")));
    }
}
