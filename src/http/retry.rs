use super::HttpError;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::sleep;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_BACKOFF_SECS: f64 = 1.5;
pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// How a response status is handled by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Terminal,
    Retryable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_backoff_secs: f64,
    timeout: Duration,
    retryable_statuses: BTreeSet<u16>,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_backoff_secs: f64, timeout_secs: f64) -> Result<Self, HttpError> {
        if !(base_backoff_secs.is_finite() && base_backoff_secs > 0.0) {
            return Err(HttpError::InvalidPolicy(format!(
                "base backoff must be > 0, got {}",
                base_backoff_secs
            )));
        }
        if !(timeout_secs.is_finite() && timeout_secs > 0.0) {
            return Err(HttpError::InvalidPolicy(format!(
                "timeout must be > 0, got {}",
                timeout_secs
            )));
        }
        let timeout = Duration::try_from_secs_f64(timeout_secs)
            .map_err(|e| HttpError::InvalidPolicy(format!("timeout out of range: {}", e)))?;

        Ok(Self {
            max_retries,
            base_backoff_secs,
            timeout,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.into_iter().collect(),
        })
    }

    /// Returns a copy of this policy retrying on `statuses` instead of the defaults.
    pub fn with_retryable_statuses<I>(&self, statuses: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        Self {
            retryable_statuses: statuses.into_iter().collect(),
            ..self.clone()
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_backoff_secs(&self) -> f64 {
        self.base_backoff_secs
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retryable_statuses(&self) -> &BTreeSet<u16> {
        &self.retryable_statuses
    }

    pub fn classify(&self, status: u16) -> StatusClass {
        if status < 400 {
            StatusClass::Success
        } else if (400..500).contains(&status) && status != 429 {
            StatusClass::Terminal
        } else if self.retryable_statuses.contains(&status) {
            StatusClass::Retryable
        } else {
            StatusClass::Terminal
        }
    }

    pub fn is_last_attempt(&self, attempt: u32) -> bool {
        attempt.saturating_add(1) >= self.max_retries
    }

    /// Wait after failed attempt `attempt` (zero-based): `base ^ attempt` seconds.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        Duration::try_from_secs_f64(self.base_backoff_secs.powi(exponent)).unwrap_or(Duration::MAX)
    }

    pub async fn wait_before_retry(&self, attempt: u32) {
        let delay = self.backoff_after(attempt);

        tracing::info!(
            "Retrying in {:.2}s (attempt {}/{})",
            delay.as_secs_f64(),
            attempt + 2,
            self.max_retries
        );
        sleep(delay).await;
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_backoff_secs: DEFAULT_BASE_BACKOFF_SECS,
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_follows_status_ranges() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.classify(200), StatusClass::Success);
        assert_eq!(policy.classify(304), StatusClass::Success);
        assert_eq!(policy.classify(400), StatusClass::Terminal);
        assert_eq!(policy.classify(401), StatusClass::Terminal);
        assert_eq!(policy.classify(404), StatusClass::Terminal);
        assert_eq!(policy.classify(429), StatusClass::Retryable);
        assert_eq!(policy.classify(500), StatusClass::Retryable);
        assert_eq!(policy.classify(503), StatusClass::Retryable);
        assert_eq!(policy.classify(501), StatusClass::Terminal);
        assert_eq!(policy.classify(599), StatusClass::Terminal);
    }

    #[test]
    fn test_429_outside_custom_set_is_terminal() {
        let policy = RetryPolicy::default().with_retryable_statuses([503]);

        assert_eq!(policy.classify(429), StatusClass::Terminal);
        assert_eq!(policy.classify(503), StatusClass::Retryable);
        assert_eq!(policy.classify(500), StatusClass::Terminal);
    }

    #[test]
    fn test_backoff_is_pure_exponential() {
        let policy = RetryPolicy::new(4, 2.0, 10.0).unwrap();

        assert_eq!(policy.backoff_after(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_after(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_after(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_after(3), Duration::from_secs(8));
    }

    #[test]
    fn test_rejects_non_positive_bounds() {
        assert!(RetryPolicy::new(3, 0.0, 30.0).is_err());
        assert!(RetryPolicy::new(3, -1.0, 30.0).is_err());
        assert!(RetryPolicy::new(3, 1.5, 0.0).is_err());
        assert!(RetryPolicy::new(3, f64::NAN, 30.0).is_err());
        assert!(RetryPolicy::new(0, 1.5, 30.0).is_ok());
    }

    #[test]
    fn test_last_attempt_detection() {
        let policy = RetryPolicy::new(3, 1.5, 30.0).unwrap();

        assert!(!policy.is_last_attempt(0));
        assert!(!policy.is_last_attempt(1));
        assert!(policy.is_last_attempt(2));
    }
}
