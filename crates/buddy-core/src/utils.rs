use std::{future::Future, time::Duration};

use crate::{errors::Error, Result};

// ============== Timeouts ==============

/// Run `fut` with a hard deadline; expiry becomes [`Error::Timeout`].
pub async fn bounded<T, F>(limit: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(Error::Timeout {
            what: what.to_string(),
            after: limit,
        }),
    }
}

// ============== Mentions ==============

/// Whether `text` contains `@handle` (case-insensitive).
pub fn mentions(text: &str, handle: &str) -> bool {
    if handle.is_empty() {
        return false;
    }
    let needle = format!("@{}", handle.to_lowercase());
    text.to_lowercase().contains(&needle)
}

/// Remove every `@handle` occurrence (case-insensitive) and trim.
pub fn strip_mention(text: &str, handle: &str) -> String {
    if handle.is_empty() {
        return text.trim().to_string();
    }
    let needle: Vec<char> = format!("@{handle}").to_lowercase().chars().collect();
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0usize;
    while i < chars.len() {
        let end = i + needle.len();
        if end <= chars.len()
            && chars[i..end]
                .iter()
                .zip(needle.iter())
                .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
        {
            i = end;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
