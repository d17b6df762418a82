use url::Url;

use crate::error::ApiError;

/// Default base URL for the public Responses API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Normalize a configured base URL.
///
/// Normalization rules:
/// 1) empty or whitespace-only input falls back to [`DEFAULT_BASE_URL`]
/// 2) trailing slashes are trimmed
/// 3) only `http` and `https` URLs with a host are accepted
pub fn normalize_base_url(input: &str) -> Result<String, ApiError> {
    let base = if input.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    let parsed = Url::parse(trimmed)
        .map_err(|error| ApiError::InvalidBaseUrl(format!("{trimmed}: {error}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::InvalidBaseUrl(format!(
            "{trimmed}: unsupported scheme '{}'",
            parsed.scheme()
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ApiError::InvalidBaseUrl(format!("{trimmed}: missing host")));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(ApiError::InvalidBaseUrl(format!(
            "{trimmed}: query and fragment are not allowed"
        )));
    }

    Ok(trimmed.to_string())
}

/// Join a normalized base URL and a relative endpoint path.
pub fn endpoint_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Path segments for the endpoints this crate talks to.
pub mod paths {
    pub const RESPONSES: &str = "responses";
    pub const CONVERSATIONS: &str = "conversations";

    pub fn response(id: &str) -> String {
        format!("{RESPONSES}/{id}")
    }

    pub fn response_cancel(id: &str) -> String {
        format!("{RESPONSES}/{id}/cancel")
    }

    pub fn conversation(id: &str) -> String {
        format!("{CONVERSATIONS}/{id}")
    }

    pub fn conversation_items(id: &str) -> String {
        format!("{CONVERSATIONS}/{id}/items")
    }

    pub fn conversation_item(id: &str, item_id: &str) -> String {
        format!("{CONVERSATIONS}/{id}/items/{item_id}")
    }
}
