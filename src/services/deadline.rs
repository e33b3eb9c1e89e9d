use std::time::{Duration, Instant};

use crate::error::RecommendError;

/// Wall-clock budget for a single recommendation call
///
/// Checked between units of work; expiry turns the whole call into an empty result,
/// never a partially ranked one.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    pub fn unbounded() -> Self {
        Self { expires_at: None }
    }

    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now().checked_add(budget),
        }
    }

    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map(Self::after).unwrap_or_else(Self::unbounded)
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }

    pub fn check(&self) -> Result<(), RecommendError> {
        if self.is_expired() {
            Err(RecommendError::DeadlineExceeded)
        } else {
            Ok(())
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::unbounded()
    }
}
