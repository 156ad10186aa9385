//! Text-generation capability used for chat replies and quizzes.

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    quiz::{extract_quiz, Quiz},
    utils::bounded,
    Error, Result,
};

/// Opaque prompt → text backend (Gemini in production).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Implementations should honour `timeout` themselves; callers also
    /// enforce it, so a backend that ignores it still cannot hang the bot.
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String>;
}

/// Generate with a hard deadline. Empty output counts as a failure.
pub async fn generate_bounded(
    generator: &dyn TextGenerator,
    prompt: &str,
    timeout: Duration,
) -> Result<String> {
    let text = bounded(timeout, "generation", generator.generate(prompt, timeout)).await?;
    if text.trim().is_empty() {
        return Err(Error::Generation("backend returned empty text".to_string()));
    }
    Ok(text)
}

/// Generate and parse one quiz.
pub async fn generate_quiz(
    generator: &dyn TextGenerator,
    prompt: &str,
    timeout: Duration,
) -> Result<Quiz> {
    let raw = generate_bounded(generator, prompt, timeout).await?;
    extract_quiz(&raw).map_err(|e| {
        tracing::warn!(error = %e, raw = %raw, "quiz parse failed");
        Error::Quiz(e)
    })
}
