use std::time::Duration;

use reqwest::StatusCode;

/// Default number of attempts, including the first one.
pub const DEFAULT_ATTEMPTS: u32 = 3;
/// Default fixed delay between attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

/// Fixed-interval retry policy applied by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below one act as one.
    pub attempts: u32,
    /// Delay between consecutive attempts.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            interval: Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    /// Whether another attempt is allowed after the zero-based `attempt` failed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts()
    }

    /// Delay before the attempt following `attempt`. No backoff, no jitter.
    pub fn delay(&self, _attempt: u32) -> Duration {
        self.interval
    }
}

/// Which response statuses count as success for a given call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcceptStatus {
    /// Only `200 OK`.
    #[default]
    Ok,
    /// `200 OK` or `202 Accepted`, used by background creates.
    OkOrAccepted,
    /// Any `2xx`.
    AnySuccess,
}

impl AcceptStatus {
    pub fn accepts(self, status: StatusCode) -> bool {
        match self {
            Self::Ok => status == StatusCode::OK,
            Self::OkOrAccepted => status == StatusCode::OK || status == StatusCode::ACCEPTED,
            Self::AnySuccess => status.is_success(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_makes_three_attempts() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
    }

    #[test]
    fn zero_attempts_still_sends_once() {
        let policy = RetryPolicy::new(0, Duration::from_millis(5));
        assert_eq!(policy.max_attempts(), 1);
        assert!(!policy.should_retry(0));
    }

    #[test]
    fn accepted_only_counts_for_background_creates() {
        assert!(!AcceptStatus::Ok.accepts(StatusCode::ACCEPTED));
        assert!(AcceptStatus::OkOrAccepted.accepts(StatusCode::ACCEPTED));
        assert!(AcceptStatus::AnySuccess.accepts(StatusCode::NO_CONTENT));
        assert!(!AcceptStatus::AnySuccess.accepts(StatusCode::BAD_REQUEST));
    }
}
