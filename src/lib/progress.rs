//! Progress tracking utilities
//!
//! A thread-safe counter that logs whenever it crosses an interval boundary.
//! The reassembler uses one to report how many chunks have been collected.

use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe progress tracker for logging progress at regular intervals.
///
/// # Example
/// ```
/// use chunkpress_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("Collected chunks").with_interval(100);
///
/// for _ in 0..250 {
///     tracker.log_if_needed(1);  // Logs at 100, 200
/// }
/// tracker.log_final();  // Logs "Collected chunks 250 (complete)"
/// ```
pub struct ProgressTracker {
    /// Progress is logged when count crosses multiples of this.
    interval: u64,
    /// Message prefix for log output.
    message: String,
    count: AtomicU64,
    /// Known total, appended to log lines as a percentage.
    total: Option<u64>,
}

impl ProgressTracker {
    /// Create a new progress tracker with a default interval of 10,000.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { interval: 10_000, message: message.into(), count: AtomicU64::new(0), total: None }
    }

    /// Set the logging interval. Zero is treated as one.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Set the expected total so log lines include a percentage.
    #[must_use]
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    /// Add to the count and log once per interval boundary crossed.
    ///
    /// Returns `true` if the new count is exactly a multiple of the interval.
    ///
    /// # Example
    /// ```
    /// use chunkpress_lib::progress::ProgressTracker;
    ///
    /// let tracker = ProgressTracker::new("Items").with_interval(100);
    /// assert!(!tracker.log_if_needed(50));  // count=50, no log
    /// assert!(!tracker.log_if_needed(60));  // count=110, logs "Items 100"
    /// assert!(tracker.log_if_needed(90));   // count=200, logs "Items 200"
    /// ```
    pub fn log_if_needed(&self, additional: u64) -> bool {
        if additional == 0 {
            let count = self.count.load(Ordering::Relaxed);
            return count > 0 && count.is_multiple_of(self.interval);
        }

        let prev = self.count.fetch_add(additional, Ordering::Relaxed);
        let new_count = prev + additional;

        for i in (prev / self.interval + 1)..=(new_count / self.interval) {
            self.log_milestone(i * self.interval, "");
        }

        new_count.is_multiple_of(self.interval)
    }

    /// Log final progress unless the last boundary already logged it.
    pub fn log_final(&self) {
        if !self.log_if_needed(0) {
            let count = self.count.load(Ordering::Relaxed);
            if count > 0 {
                self.log_milestone(count, " (complete)");
            }
        }
    }

    /// Get the current count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn log_milestone(&self, count: u64, suffix: &str) {
        match self.total {
            Some(total) if total > 0 => {
                let fraction = count as f64 / total as f64;
                info!(
                    "{} {}/{} ({}){suffix}",
                    self.message,
                    count,
                    total,
                    crate::logging::format_percent(fraction, 1)
                );
            }
            _ => info!("{} {}{suffix}", self.message, count),
        }
    }
}
