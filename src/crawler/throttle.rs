//! Fixed pacing between page round trips

use std::time::Duration;

/// Self-imposed rate limit for a single page session
///
/// Every round trip after the first is preceded by the same fixed delay. The
/// delay never adapts to host behavior.
#[derive(Debug, Clone)]
pub struct Throttle {
    delay: Duration,
    round_trips: u64,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            round_trips: 0,
        }
    }

    /// Waits as required before the next round trip and records it
    pub async fn before_round_trip(&mut self) {
        if self.round_trips > 0 && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.round_trips += 1;
    }

    /// Number of round trips issued through this throttle
    pub fn round_trips(&self) -> u64 {
        self.round_trips
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_first_round_trip_is_free() {
        let mut throttle = Throttle::new(Duration::from_millis(300));
        let start = Instant::now();

        throttle.before_round_trip().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        throttle.before_round_trip().await;
        throttle.before_round_trip().await;
        assert_eq!(start.elapsed(), Duration::from_millis(600));
        assert_eq!(throttle.round_trips(), 3);
    }

    #[tokio::test]
    async fn test_zero_delay() {
        let mut throttle = Throttle::new(Duration::ZERO);
        for _ in 0..5 {
            throttle.before_round_trip().await;
        }
        assert_eq!(throttle.round_trips(), 5);
    }
}
