//! Cross-messenger abstractions (Telegram today).

pub mod chunking;
pub mod port;
pub mod throttled;
pub mod types;
