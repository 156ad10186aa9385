//! Long-poll retrieval loop.
//!
//! One sequential loop: fetch a batch, acknowledge it by advancing the offset,
//! dispatch each event in arrival order. Two failure regimes:
//! - conflict (another consumer polling the same bot): clear the webhook, then
//!   exponential backoff, same offset
//! - anything else: fixed short delay, same offset

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    backoff::{Backoff, Sleeper, TokioSleeper},
    config::Config,
    dispatch::Dispatcher,
    messaging::{
        port::UpdateSource,
        types::{Update, ALLOWED_UPDATES},
    },
    utils::bounded,
    Result,
};

/// Extra time allowed on top of the long-poll wait before a fetch is abandoned.
/// HTTP clients doing the fetch must allow at least `long_poll_timeout + FETCH_GRACE`.
pub const FETCH_GRACE: Duration = Duration::from_secs(15);

#[derive(Clone, Debug)]
pub struct LoopSettings {
    pub long_poll_timeout: Duration,
    pub conflict_backoff_seed: Duration,
    pub conflict_backoff_max: Duration,
    pub transient_retry_delay: Duration,
    pub loop_pause: Duration,
}

impl From<&Config> for LoopSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            long_poll_timeout: cfg.long_poll_timeout,
            conflict_backoff_seed: cfg.conflict_backoff_seed,
            conflict_backoff_max: cfg.conflict_backoff_max,
            transient_retry_delay: cfg.transient_retry_delay,
            loop_pause: cfg.loop_pause,
        }
    }
}

/// What one iteration did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Batch fetched and dispatched (possibly empty).
    Delivered(usize),
    /// Conflict; waited this long before returning.
    Conflict(Duration),
    /// Other failure; waited this long before returning.
    Failed(Duration),
}

pub struct UpdateLoop {
    source: Arc<dyn UpdateSource>,
    dispatcher: Arc<Dispatcher>,
    sleeper: Arc<dyn Sleeper>,
    backoff: Backoff,
    offset: i64,
    settings: LoopSettings,
}

impl UpdateLoop {
    pub fn new(
        source: Arc<dyn UpdateSource>,
        dispatcher: Arc<Dispatcher>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            source,
            dispatcher,
            sleeper: Arc::new(TokioSleeper),
            backoff: Backoff::new(
                settings.conflict_backoff_seed,
                2,
                settings.conflict_backoff_max,
            ),
            offset: 0,
            settings,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Next update id to request.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Loop until `cancel` fires.
    ///
    /// Cancellation interrupts the fetch and the waits between iterations,
    /// never a batch being dispatched.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("update loop started");
        loop {
            let fetched = tokio::select! {
              biased;
              _ = cancel.cancelled() => break,
              fetched = self.fetch() => fetched,
            };
            let outcome = self.handle(fetched).await;

            tokio::select! {
              biased;
              _ = cancel.cancelled() => break,
              _ = self.sleeper.sleep(self.delay_after(outcome)) => {}
            }
        }
        info!(offset = self.offset, "update loop stopped");
    }

    /// One fetch + dispatch (or one failure), then the matching wait.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let fetched = self.fetch().await;
        let outcome = self.handle(fetched).await;
        self.sleeper.sleep(self.delay_after(outcome)).await;
        outcome
    }

    async fn fetch(&self) -> Result<Vec<Update>> {
        bounded(
            self.settings.long_poll_timeout + FETCH_GRACE,
            "getUpdates",
            self.source.fetch_updates(
                self.offset,
                self.settings.long_poll_timeout,
                &ALLOWED_UPDATES,
            ),
        )
        .await
    }

    async fn handle(&mut self, fetched: Result<Vec<Update>>) -> PollOutcome {
        let batch = match fetched {
            Ok(batch) => batch,
            Err(e) if e.is_conflict() => {
                let delay = self.backoff.next_delay();
                warn!(error = %e, delay_secs = delay.as_secs(), "update conflict, backing off");
                if let Err(clear) = self.source.clear_pending_subscription().await {
                    warn!(error = %clear, "failed to clear webhook");
                }
                return PollOutcome::Conflict(delay);
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch updates");
                return PollOutcome::Failed(self.settings.transient_retry_delay);
            }
        };

        self.backoff.reset();

        if let Some(max_id) = batch.iter().map(|u| u.update_id).max() {
            self.offset = self.offset.max(max_id + 1);
        }

        let count = batch.len();
        if count > 0 {
            debug!(count, offset = self.offset, "dispatching updates");
        }
        for update in batch {
            self.dispatcher.dispatch(update.event).await;
        }
        PollOutcome::Delivered(count)
    }

    fn delay_after(&self, outcome: PollOutcome) -> Duration {
        match outcome {
            // Keeps an immediately-returning platform from spinning the loop.
            PollOutcome::Delivered(_) => self.settings.loop_pause,
            PollOutcome::Conflict(d) | PollOutcome::Failed(d) => d,
        }
    }
}
