use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cancel::{await_or_cancel, ensure_not_cancelled, sleep_or_cancel, CancelSignal};
use crate::config::ApiConfig;
use crate::error::{parse_error_code, parse_error_message, ApiError};
use crate::headers::{build_headers, CONTENT_TYPE_EVENT_STREAM, CONTENT_TYPE_JSON};
use crate::retry::AcceptStatus;
use crate::url::{endpoint_url, normalize_base_url};

/// One logical API call. The body is serialized once, up front, so every
/// retry attempt replays identical bytes.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub accept: AcceptStatus,
    pub event_stream: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            accept: AcceptStatus::Ok,
            event_stream: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Serializes `body` into the buffered request body.
    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let bytes =
            serde_json::to_vec(body).map_err(|error| ApiError::decode("request body", error))?;
        self.body = Some(bytes);
        Ok(self)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn accepting(mut self, accept: AcceptStatus) -> Self {
        self.accept = accept;
        self
    }

    /// Requests a server-sent event stream instead of a JSON document.
    pub fn streaming(mut self) -> Self {
        self.event_stream = true;
        self
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self, context: &'static str) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|error| ApiError::decode(context, error))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// JSON-over-HTTP transport with retry, body replay, and optional logging.
#[derive(Debug)]
pub struct Transport {
    http: Client,
    config: ApiConfig,
    base_url: String,
    logging: AtomicBool,
}

impl Transport {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(&config.base_url)?;
        if config.api_key.trim().is_empty() {
            return Err(ApiError::MissingApiKey);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|source| ApiError::Transport {
            elapsed: std::time::Duration::ZERO,
            source,
        })?;
        let logging = AtomicBool::new(config.log_requests);

        Ok(Self {
            http,
            config,
            base_url,
            logging,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        endpoint_url(&self.base_url, path)
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging.load(Ordering::Acquire)
    }

    pub fn set_logging(&self, enabled: bool) {
        self.logging.store(enabled, Ordering::Release);
    }

    pub fn build_headers(&self, accept: &str) -> Result<HeaderMap, ApiError> {
        let headers = build_headers(&self.config, accept)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ApiError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value)
                    .map_err(|_| ApiError::InvalidHeader(format!("invalid header value for {key}")))?,
            );
        }
        Ok(out)
    }

    pub fn build_request(&self, request: &ApiRequest) -> Result<reqwest::RequestBuilder, ApiError> {
        let accept = if request.event_stream {
            CONTENT_TYPE_EVENT_STREAM
        } else {
            CONTENT_TYPE_JSON
        };
        let headers = self.build_headers(accept)?;

        let mut builder = self
            .http
            .request(request.method.clone(), self.url_for(&request.path))
            .headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        Ok(builder)
    }

    /// Sends `request`, retrying per the configured policy, and returns the
    /// accepted response with its body still unread.
    pub async fn send(
        &self,
        request: &ApiRequest,
        cancellation: Option<&CancelSignal>,
    ) -> Result<Response, ApiError> {
        let policy = self.config.retry;
        let mut attempt = 0;

        loop {
            ensure_not_cancelled(cancellation)?;
            self.log_request(request);

            let started = Instant::now();
            let sent = await_or_cancel(self.build_request(request)?.send(), cancellation).await?;

            let error = match sent {
                Ok(response) if request.accept.accepts(response.status()) => {
                    self.note_outcome(true);
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status();
                    let body = await_or_cancel(response.text(), cancellation)
                        .await?
                        .unwrap_or_default();
                    self.log_response(status, &body);
                    ApiError::Status {
                        status,
                        code: parse_error_code(&body),
                        message: parse_error_message(status, &body),
                        body,
                    }
                }
                Err(source) => ApiError::Transport {
                    elapsed: started.elapsed(),
                    source,
                },
            };

            self.note_outcome(false);
            if !policy.should_retry(attempt) {
                return Err(error);
            }

            tracing::debug!(
                attempt = attempt + 1,
                max_attempts = policy.max_attempts(),
                error = %error,
                "retrying request"
            );
            sleep_or_cancel(policy.delay(attempt), cancellation).await?;
            attempt += 1;
        }
    }

    /// Sends `request` and buffers the whole response body.
    pub async fn send_buffered(
        &self,
        request: &ApiRequest,
        cancellation: Option<&CancelSignal>,
    ) -> Result<ApiResponse, ApiError> {
        let started = Instant::now();
        let response = self.send(request, cancellation).await?;
        let status = response.status();
        let body = await_or_cancel(response.bytes(), cancellation)
            .await?
            .map_err(|source| ApiError::Transport {
                elapsed: started.elapsed(),
                source,
            })?
            .to_vec();

        if self.logging_enabled() {
            self.log_response(status, &String::from_utf8_lossy(&body));
        }

        Ok(ApiResponse { status, body })
    }

    fn note_outcome(&self, success: bool) {
        if self.config.auto_log {
            self.set_logging(!success);
        }
    }

    fn log_request(&self, request: &ApiRequest) {
        if !self.logging_enabled() {
            return;
        }
        let body = request
            .body
            .as_deref()
            .map(String::from_utf8_lossy)
            .unwrap_or_default();
        tracing::debug!(
            method = %request.method,
            url = %self.url_for(&request.path),
            query = ?request.query,
            body = %body,
            "api request"
        );
    }

    fn log_response(&self, status: StatusCode, body: &str) {
        if !self.logging_enabled() {
            return;
        }
        tracing::debug!(status = %status, body = %body, "api response");
    }
}
