use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use tabspace_lib::{Timestamp, WorkspaceId};

/// Hands out workspace ids from the millisecond clock. Two calls within the
/// same millisecond (or across a backwards clock step) still get strictly
/// increasing values.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id paired with the timestamp it was derived from.
    pub fn next(&self) -> (WorkspaceId, Timestamp) {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        let issued = now.max(previous + 1);
        (issued.to_string(), issued)
    }
}
