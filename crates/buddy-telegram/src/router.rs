use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::Me;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use buddy_core::messaging::throttled::{ThrottleConfig, ThrottledMessenger};
use buddy_core::{
    backoff::Backoff,
    broadcast::BroadcastScheduler,
    config::Config,
    destinations::DestinationSet,
    dispatch::Dispatcher,
    domain::{BotIdentity, UserId},
    generation::TextGenerator,
    messaging::port::{MessagingPort, UpdateSource},
    polls::PollRegistry,
    update_loop::{UpdateLoop, FETCH_GRACE},
};

use crate::{long_polling_bot, TelegramMessenger};

const STARTUP_ATTEMPTS: usize = 5;

/// Run the bot until Ctrl-C: hourly broadcasts plus the long-poll loop.
pub async fn run_polling(
    cfg: Arc<Config>,
    generator: Arc<dyn TextGenerator>,
) -> anyhow::Result<()> {
    let bot = long_polling_bot(
        cfg.telegram_bot_token.clone(),
        cfg.long_poll_timeout + FETCH_GRACE,
    )?;

    let me = get_me_with_retry(&bot).await?;
    let identity = BotIdentity {
        user_id: UserId(me.user.id.0 as i64),
        username: me.username().to_string(),
    };
    info!(username = %identity.username, model = %cfg.gemini_model, "bot started");

    // Outbound sends go through the throttling decorator; the adapter still
    // retries once on a 429 RetryAfter. Update retrieval talks to Telegram directly.
    let telegram = Arc::new(TelegramMessenger::new(bot));
    let source: Arc<dyn UpdateSource> = telegram.clone();
    let raw_messenger: Arc<dyn MessagingPort> = telegram;
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let polls = Arc::new(PollRegistry::new());
    let destinations = Arc::new(DestinationSet::new());

    let broadcaster = Arc::new(BroadcastScheduler::new(
        generator.clone(),
        messenger.clone(),
        polls.clone(),
        destinations.clone(),
        (&*cfg).into(),
    ));

    let dispatcher = Arc::new(Dispatcher::new(
        identity,
        messenger,
        generator,
        polls,
        destinations,
        broadcaster.clone(),
        (&*cfg).into(),
    ));

    let cancel = CancellationToken::new();
    let scheduler_task = broadcaster.spawn_hourly(cancel.clone());

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("shutdown requested"),
                Err(e) => error!(error = %e, "failed to listen for ctrl-c"),
            }
            cancel.cancel();
        });
    }

    UpdateLoop::new(source, dispatcher, (&*cfg).into())
        .run(cancel.clone())
        .await;

    cancel.cancel();
    if let Err(e) = scheduler_task.await {
        warn!(error = %e, "broadcast scheduler task ended abnormally");
    }
    Ok(())
}

/// `getMe` with bounded exponential backoff; the bot cannot run without its identity.
async fn get_me_with_retry(bot: &Bot) -> anyhow::Result<Me> {
    let mut backoff = Backoff::new(Duration::from_secs(1), 2, Duration::from_secs(30));
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        match bot.get_me().await {
            Ok(me) => return Ok(me),
            Err(e) if attempt < STARTUP_ATTEMPTS => {
                let delay = backoff.next_delay();
                warn!(attempt, error = %e, delay_secs = delay.as_secs(), "getMe failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to reach Telegram after {STARTUP_ATTEMPTS} attempts: {e}"
                ));
            }
        }
    }
}
