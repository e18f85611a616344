/// Bounded retry for requests rejected with 401.
///
/// A retry only happens when the token store changed under the request
/// (e.g. a login completed while it was in flight). Resending the same
/// token would just fail again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 1 }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self { max_retries: 0 }
    }

    pub fn should_retry(&self, attempt: u32, sent: Option<&str>, current: Option<&str>) -> bool {
        if attempt >= self.max_retries {
            return false;
        }
        matches!(current, Some(token) if Some(token) != sent)
    }
}
