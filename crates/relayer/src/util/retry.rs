use core::time::Duration;

pub use retry::{retry_with_index, Error as RetryError, OperationResult as RetryResult};

/// A delay that starts at `delay` and grows by `incr` at each step.
#[derive(Copy, Clone, Debug)]
pub struct ConstantGrowth {
    delay: Duration,
    incr: Duration,
}

impl ConstantGrowth {
    pub const fn new(delay: Duration, incr: Duration) -> Self {
        Self { delay, incr }
    }

    pub const fn clamp(self, max_delay: Duration, max_retries: usize) -> Clamped<Self> {
        Clamped::new(self, max_delay, max_retries)
    }
}

impl From<Duration> for ConstantGrowth {
    fn from(delay: Duration) -> Self {
        Self::new(delay, Duration::from_secs(1))
    }
}

impl Iterator for ConstantGrowth {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let delay = self.delay;

        if let Some(next) = self.delay.checked_add(self.incr) {
            self.delay = next;
        }

        Some(delay)
    }
}

/// A delay that is multiplied by `factor` at each step.
#[derive(Copy, Clone, Debug)]
pub struct ExponentialGrowth {
    delay: Duration,
    factor: u32,
}

impl ExponentialGrowth {
    pub const fn new(delay: Duration, factor: u32) -> Self {
        Self { delay, factor }
    }

    pub const fn clamp(self, max_delay: Duration, max_retries: usize) -> Clamped<Self> {
        Clamped::new(self, max_delay, max_retries)
    }
}

impl Iterator for ExponentialGrowth {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let delay = self.delay;

        if let Some(next) = self.delay.checked_mul(self.factor) {
            self.delay = next;
        }

        Some(delay)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Clamped<S> {
    pub strategy: S,
    pub max_delay: Duration,
    pub max_retries: usize,
}

impl<S> Clamped<S> {
    pub const fn new(strategy: S, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            strategy,
            max_delay,
            max_retries,
        }
    }

    pub fn iter(self) -> impl Iterator<Item = Duration>
    where
        S: Iterator<Item = Duration>,
    {
        let Self {
            strategy,
            max_retries,
            max_delay,
        } = self;

        strategy
            .take(max_retries)
            .map(move |delay| delay.min(max_delay))
    }
}

/// Caps each delay of `strategy` to `max_delay`, and stops once the sum of
/// the delays would exceed `max_total_delay`.
pub fn clamp_total<S>(
    strategy: S,
    max_delay: Duration,
    max_total_delay: Duration,
) -> impl Iterator<Item = Duration>
where
    S: Iterator<Item = Duration>,
{
    strategy
        .map(move |delay| delay.min(max_delay))
        .scan(Duration::ZERO, move |elapsed, delay| {
            let next = *elapsed + delay;

            if next > max_total_delay {
                None
            } else {
                *elapsed = next;
                Some(delay)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    const CONST_STRATEGY: ConstantGrowth =
        ConstantGrowth::new(Duration::from_secs(1), Duration::from_millis(500));

    #[test]
    fn const_growth_no_clamp() {
        let delays = CONST_STRATEGY.take(4).collect::<Vec<_>>();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(1500),
                Duration::from_millis(2000),
                Duration::from_millis(2500),
            ]
        );
    }

    #[test]
    fn clamped_const_growth_max_retries() {
        let strategy = CONST_STRATEGY.clamp(Duration::from_secs(10000), 3);
        let delays = strategy.iter().collect::<Vec<_>>();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(1500),
                Duration::from_millis(2000),
            ]
        );
    }

    #[test]
    fn clamped_exponential_growth() {
        let strategy = ExponentialGrowth::new(Duration::from_millis(200), 2)
            .clamp(Duration::from_secs(5), 6);
        let delays = strategy.iter().collect::<Vec<_>>();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
                Duration::from_millis(1600),
                Duration::from_millis(3200),
                Duration::from_millis(5000),
            ]
        );
    }

    #[test]
    fn clamp_total_stops_at_max_delay() {
        let strategy = ConstantGrowth::new(Duration::from_secs(1), Duration::ZERO);
        let delays = clamp_total(strategy, Duration::from_secs(1), Duration::from_secs(3))
            .collect::<Vec<_>>();

        assert_eq!(delays, vec![Duration::from_secs(1); 3]);
    }
}
