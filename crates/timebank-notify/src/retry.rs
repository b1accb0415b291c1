use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
}

pub trait BackoffPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration;
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff_ms: 30_000,
        }
    }
}

impl BackoffPolicy for RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_linearly_with_attempts() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_backoff_ms: 100,
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300));
    }
}
