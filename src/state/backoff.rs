use std::time::Duration;

/// Linear reconnect backoff.
///
/// Every failed connect attempt lengthens the wait by one `step`; a
/// successful connect resets it to `base`.
///
/// ```
/// use std::time::Duration;
/// use slirc_session::state::Backoff;
///
/// let mut b = Backoff::new(Duration::from_secs(5), Duration::from_secs(5));
/// assert_eq!(b.on_fail(), Duration::from_secs(10));
/// assert_eq!(b.on_fail(), Duration::from_secs(15));
/// b.on_success();
/// assert_eq!(b.current(), Duration::from_secs(5));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    step: Duration,
    current: Duration,
}

impl Backoff {
    /// Default starting interval.
    pub const DEFAULT_BASE: Duration = Duration::from_secs(5);
    /// Default increment per failed attempt.
    pub const DEFAULT_STEP: Duration = Duration::from_secs(5);

    /// New policy starting at `base`.
    pub fn new(base: Duration, step: Duration) -> Self {
        Backoff {
            base,
            step,
            current: base,
        }
    }

    /// Interval that will be used for the next reconnect.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Starting interval.
    pub fn base(&self) -> Duration {
        self.base
    }

    /// Record a failed attempt; returns the lengthened interval.
    pub fn on_fail(&mut self) -> Duration {
        self.current = self.current.saturating_add(self.step);
        self.current
    }

    /// Record a successful connect.
    pub fn on_success(&mut self) {
        self.current = self.base;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new(Self::DEFAULT_BASE, Self::DEFAULT_STEP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_growth() {
        let mut b = Backoff::default();
        for n in 1..=10u32 {
            b.on_fail();
            assert_eq!(b.current(), Backoff::DEFAULT_BASE + Backoff::DEFAULT_STEP * n);
        }
        b.on_success();
        assert_eq!(b.current(), b.base());
    }

    #[test]
    fn test_saturates() {
        let mut b = Backoff::new(Duration::MAX, Duration::from_secs(1));
        assert_eq!(b.on_fail(), Duration::MAX);
    }
}
