//! Splitting long replies into platform-sized messages.

use std::time::Duration;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::port::MessagingPort,
    utils::bounded,
    Result,
};

/// Split `text` into consecutive chunks of at most `limit` chars.
///
/// Splits on char boundaries so multi-byte text is never cut mid-codepoint.
pub fn split_chunks(text: &str, limit: usize) -> Vec<&str> {
    let limit = limit.max(1);
    let mut out = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let cut = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        out.push(&rest[..cut]);
        rest = &rest[cut..];
    }
    out
}

/// Send `text` as one or more messages, in order.
///
/// Only the first chunk is linked to `reply_to`. Stops at the first failed send.
pub async fn send_chunked(
    messenger: &dyn MessagingPort,
    chat_id: ChatId,
    text: &str,
    reply_to: Option<MessageId>,
    limit: usize,
    send_timeout: Duration,
) -> Result<Vec<MessageRef>> {
    let mut sent = Vec::new();
    for (idx, chunk) in split_chunks(text, limit).into_iter().enumerate() {
        let link = if idx == 0 { reply_to } else { None };
        let msg = bounded(
            send_timeout,
            "sendMessage",
            messenger.send_text(chat_id, chunk, link),
        )
        .await?;
        sent.push(msg);
    }
    Ok(sent)
}
