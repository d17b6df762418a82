//! Client-level options layered over the transport configuration.

use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_STREAM_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Model used when a request leaves `model` empty.
    pub default_model: String,
    /// Interval used by [`crate::ResponsesClient::poll`] callers that pass none.
    pub poll_interval: Duration,
    /// Capacity of the channel behind each event stream.
    pub stream_buffer: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_owned(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }
}

impl ClientOptions {
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Zero is raised to one; a channel needs room for at least one event.
    pub fn with_stream_buffer(mut self, capacity: usize) -> Self {
        self.stream_buffer = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.default_model, DEFAULT_MODEL);
        assert_eq!(options.poll_interval, Duration::from_secs(1));
        assert_eq!(options.stream_buffer, 64);
    }

    #[test]
    fn stream_buffer_never_drops_to_zero() {
        let options = ClientOptions::default()
            .with_default_model("gpt-test")
            .with_stream_buffer(0);
        assert_eq!(options.stream_buffer, 1);
        assert_eq!(options.default_model, "gpt-test");
    }
}
