//! The per-plugin failure buffer itself, isolated from storage/notification
//! concerns so it's trivial to unit test.

use chrono::{DateTime, Duration, Utc};

/// A plugin's recent failure timestamps, oldest first.
#[derive(Debug, Clone, Default)]
pub struct FailureWindow {
    failures: Vec<DateTime<Utc>>,
}

impl FailureWindow {
    /// Record a failure at `now`, pruning entries older than `now - window`,
    /// and return the number of failures remaining in the window.
    pub fn record_failure(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        self.failures.push(now);
        let cutoff = now - window;
        self.failures.retain(|t| *t > cutoff);
        self.failures.len()
    }

    /// Forget all recorded failures (on success, or after auto-disable).
    pub fn clear(&mut self) {
        self.failures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prunes_entries_older_than_window() {
        let mut window = FailureWindow::default();
        let window_width = Duration::minutes(5);
        let base = Utc::now();

        assert_eq!(window.record_failure(base, window_width), 1);
        assert_eq!(
            window.record_failure(base + Duration::minutes(1), window_width),
            2
        );
        // Falls outside the 5-minute window anchored on the first two
        // failures, so it prunes them and counts only itself.
        let count = window.record_failure(base + Duration::minutes(10), window_width);
        assert_eq!(count, 1);
    }

    #[test]
    fn clear_resets_the_buffer() {
        let mut window = FailureWindow::default();
        let now = Utc::now();
        window.record_failure(now, Duration::minutes(5));
        window.clear();
        assert_eq!(window.record_failure(now, Duration::minutes(5)), 1);
    }
}
