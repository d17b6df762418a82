use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API key is required")]
    MissingApiKey,

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("request failed after {elapsed:?}: {source}")]
    Transport {
        elapsed: Duration,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status}: {body}")]
    Status {
        status: StatusCode,
        code: Option<String>,
        message: String,
        body: String,
    },

    #[error("failed to decode {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported {parent} tag '{tag}'")]
    UnsupportedTag { parent: &'static str, tag: String },

    #[error("{0}")]
    InvalidItem(String),

    #[error("malformed SSE event: {0}")]
    MalformedSse(String),

    #[error("unknown stream event type '{0}'")]
    UnknownEvent(String),

    #[error("request was cancelled")]
    Cancelled,
}

impl ApiError {
    #[must_use]
    pub fn decode(context: &'static str, source: serde_json::Error) -> Self {
        Self::Decode { context, source }
    }

    #[must_use]
    pub fn unsupported_tag(parent: &'static str, tag: impl Into<String>) -> Self {
        Self::UnsupportedTag {
            parent,
            tag: tag.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(rename = "error")]
    pub value: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayloadFields {
    pub message: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

impl ErrorPayloadFields {
    fn kind(&self) -> Option<&str> {
        self.code
            .as_deref()
            .and_then(non_empty_string)
            .or_else(|| self.type_.as_deref().and_then(non_empty_string))
    }
}

fn error_fields(body: &str) -> Option<ErrorPayloadFields> {
    serde_json::from_str::<ErrorPayload>(body).ok()?.value
}

/// Summarize an error response body for display.
///
/// Prefers the JSON `error.message` field, then the raw body, then the
/// canonical reason phrase of `status`.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let message = error_fields(body).and_then(|error| error.message);
    if let Some(message) = message.as_deref().and_then(non_empty_string) {
        return message.to_owned();
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

/// Machine-readable kind of an error response body: `error.code`, falling
/// back to `error.type`.
pub fn parse_error_code(body: &str) -> Option<String> {
    error_fields(body)?.kind().map(str::to_owned)
}

fn non_empty_string(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
