//! Retry delays for the update loop, kept free of real timers.

use std::time::Duration;

use async_trait::async_trait;

/// Exponential backoff: `seed`, `seed * m`, `seed * m^2`, ... capped at `ceiling`.
#[derive(Clone, Debug)]
pub struct Backoff {
    seed: Duration,
    multiplier: u32,
    ceiling: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(seed: Duration, multiplier: u32, ceiling: Duration) -> Self {
        let seed = seed.min(ceiling);
        Self {
            seed,
            multiplier: multiplier.max(1),
            ceiling,
            current: seed,
        }
    }

    /// The delay to wait now; advances the policy for the next call.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self
            .current
            .checked_mul(self.multiplier)
            .unwrap_or(self.ceiling)
            .min(self.ceiling);
        delay
    }

    /// Back to the seed delay (after a successful attempt).
    pub fn reset(&mut self) {
        self.current = self.seed;
    }
}

/// Sleep abstraction so loops can be driven without waiting in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, dur: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, dur: Duration) {
        tokio::time::sleep(dur).await;
    }
}
