use std::sync::Arc;

use buddy_core::{config::Config, generation::TextGenerator};
use buddy_gemini::GeminiClient;

#[tokio::main]
async fn main() -> Result<(), buddy_core::Error> {
    buddy_core::logging::init("buddy")?;

    let cfg = Arc::new(Config::load()?);
    tracing::info!(
        model = %cfg.gemini_model,
        poll_ttl_hours = cfg.poll_ttl.map(|d| d.as_secs() / 3600),
        "configuration loaded"
    );

    let generator: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(
        cfg.gemini_api_key.clone(),
        cfg.gemini_model.clone(),
    )?);

    buddy_telegram::router::run_polling(cfg, generator)
        .await
        .map_err(|e| buddy_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
