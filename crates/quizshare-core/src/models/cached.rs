//! Timestamped cache entries

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A value remembered together with the time it was stored (unix ms).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry<T> {
    pub data: T,
    pub timestamp: i64,
}

impl<T> CachedEntry<T> {
    /// Wrap `data` stamped with the current time.
    pub fn now(data: T) -> Self {
        Self {
            data,
            timestamp: crate::util::unix_millis_now(),
        }
    }

    /// Whether the entry is younger than `max_age` at `now_ms`.
    pub fn is_fresh(&self, max_age: Duration, now_ms: i64) -> bool {
        let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(self.timestamp) < max_age_ms
    }
}
