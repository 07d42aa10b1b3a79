use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl ExponentialBackoff {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts: 0,
            base_delay,
            max_delay,
        }
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn next_delay(&self) -> Duration {
        let multiplier = 2u32.saturating_pow(self.attempts.min(31));
        self.base_delay.saturating_mul(multiplier).min(self.max_delay)
    }

    pub fn bump(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_until_capped() {
        let mut backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(5));

        let mut delays = vec![];
        for _ in 0..5 {
            delays.push(backoff.next_delay().as_secs());
            backoff.bump();
        }

        assert_eq!(delays, vec![1, 2, 4, 5, 5]);
        assert_eq!(backoff.attempts(), 5);
    }

    #[test]
    fn reset_starts_over() {
        let mut backoff = ExponentialBackoff::new(Duration::from_millis(250), Duration::from_secs(30));
        backoff.bump();
        backoff.bump();

        backoff.reset();

        assert_eq!(backoff.next_delay(), Duration::from_millis(250));
    }
}
