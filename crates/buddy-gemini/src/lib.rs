//! Gemini adapter (text generation).
//!
//! Uses the `models/{model}:generateContent` endpoint with a single text part.

use std::time::Duration;

use async_trait::async_trait;
use buddy_core::{errors::Error, generation::TextGenerator, Result};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone, Debug)]
pub struct GeminiClient {
    pub model: String,
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::External(format!("gemini client build error: {e}")))?;
        Ok(Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: API_BASE.to_string(),
            http,
        })
    }

    /// Point at a different API root (proxies, local stubs).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String> {
        let body = request_body(prompt);

        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout {
                        what: "gemini generateContent".to_string(),
                        after: timeout,
                    }
                } else {
                    Error::External(format!("gemini request error: {e}"))
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "gemini returned {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Generation(format!("gemini json error: {e}")))?;

        let text = response_text(&v)?;
        tracing::debug!(model = %self.model, chars = text.chars().count(), "gemini reply");
        Ok(text)
    }
}

fn request_body(prompt: &str) -> serde_json::Value {
    serde_json::json!({
        "contents": [{ "parts": [{ "text": prompt }] }]
    })
}

/// Concatenate the text parts of the first candidate.
fn response_text(v: &serde_json::Value) -> Result<String> {
    let Some(parts) = v
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
    else {
        let reason = v
            .pointer("/promptFeedback/blockReason")
            .and_then(|r| r.as_str())
            .unwrap_or("no candidates");
        return Err(Error::Generation(format!("gemini returned no text ({reason})")));
    };

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.trim().is_empty() {
        return Err(Error::Generation("gemini returned empty text".to_string()));
    }
    Ok(text)
}
