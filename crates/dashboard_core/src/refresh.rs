use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::store::{AutoRefreshEnabled, CachedTable, LastRefresh, SessionStore};

pub const DEFAULT_AUTO_REFRESH: Duration = Duration::from_secs(30);
const MIN_AUTO_REFRESH: Duration = Duration::from_secs(1);

/// Elapsed-time check evaluated once per render pass. Never sleeps.
#[derive(Debug, Clone, Copy)]
pub struct AutoRefresh {
    interval: Duration,
}

impl AutoRefresh {
    /// Intervals under a second are raised to one, so a due check always
    /// leaves room for a page to render.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_AUTO_REFRESH),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_due(&self, store: &SessionStore, now: DateTime<Utc>) -> bool {
        if !store.get::<AutoRefreshEnabled>() {
            return false;
        }
        match store.get::<LastRefresh>() {
            None => true,
            // A negative delta (clock stepped back) is not due.
            Some(last) => (now - last)
                .to_std()
                .is_ok_and(|elapsed| elapsed >= self.interval),
        }
    }

    /// Stamps the refresh time and drops the cached table when due.
    /// Returns whether a re-render was requested.
    pub fn check(&self, store: &mut SessionStore, now: DateTime<Utc>) -> bool {
        if !self.is_due(store, now) {
            return false;
        }
        store.set::<LastRefresh>(Some(now));
        store.set::<CachedTable>(None);
        true
    }
}

impl Default for AutoRefresh {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_REFRESH)
    }
}
