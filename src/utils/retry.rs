//! Retry utilities: backoff builders for broker connection.
//!
//! Backoffs plug into `backon`'s `Retryable`, so callers write
//! `(|| dial()).retry(builder).notify(..).await`.

use std::time::Duration;

use backon::BackoffBuilder;

/// Default number of retries after the first failed broker dial.
pub const DEFAULT_CONNECT_RETRIES: usize = 5;

/// Quadratic backoff: the n-th retry waits `n²` units.
///
/// With the default unit of one second and five retries the delays are
/// 1s, 4s, 9s, 16s, 25s, giving six attempts in total.
#[derive(Debug, Clone, Copy)]
pub struct QuadraticBuilder {
    unit: Duration,
    max_times: usize,
}

impl Default for QuadraticBuilder {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            max_times: DEFAULT_CONNECT_RETRIES,
        }
    }
}

impl QuadraticBuilder {
    /// Set the base unit multiplied by `n²`.
    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    /// Set the maximum number of retries.
    pub fn with_max_times(mut self, max_times: usize) -> Self {
        self.max_times = max_times;
        self
    }
}

impl BackoffBuilder for QuadraticBuilder {
    type Backoff = QuadraticBackoff;

    fn build(self) -> Self::Backoff {
        QuadraticBackoff {
            unit: self.unit,
            max_times: self.max_times,
            count: 0,
        }
    }
}

/// Iterator of quadratic delays produced by [`QuadraticBuilder`].
#[derive(Debug, Clone)]
pub struct QuadraticBackoff {
    unit: Duration,
    max_times: usize,
    count: usize,
}

impl Iterator for QuadraticBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.count >= self.max_times {
            return None;
        }
        self.count += 1;
        let factor = u32::try_from(self.count * self.count).unwrap_or(u32::MAX);
        Some(self.unit.saturating_mul(factor))
    }
}
