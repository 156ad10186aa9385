use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

/// Typed configuration, read from the environment (and an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Credentials
    pub telegram_bot_token: String,
    pub gemini_api_key: String,
    pub gemini_model: String,

    // Update loop
    pub long_poll_timeout: Duration,
    pub conflict_backoff_seed: Duration,
    pub conflict_backoff_max: Duration,
    pub transient_retry_delay: Duration,
    pub loop_pause: Duration,

    // Outbound call budgets
    pub quiz_timeout: Duration,
    pub chat_timeout: Duration,
    pub send_timeout: Duration,

    // Telegram limits
    pub telegram_message_limit: usize,

    /// Pending polls older than this are forgotten; `None` keeps them forever.
    pub poll_ttl: Option<Duration>,

    /// Credit line appended to `/help`.
    pub bot_creator: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Build from an arbitrary key lookup (the process env in `load()`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |k: &str| lookup(k).and_then(non_empty);
        let secs = |k: &str, d: u64| Duration::from_secs(parse_or(get(k), d));

        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;
        let gemini_api_key = get("GEMINI_API_KEY").ok_or_else(|| {
            Error::Config("GEMINI_API_KEY environment variable is required".to_string())
        })?;
        let gemini_model = get("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.0-flash".to_string());

        let conflict_backoff_seed = secs("CONFLICT_BACKOFF_SEED_SECS", 5);
        let conflict_backoff_max = secs("CONFLICT_BACKOFF_MAX_SECS", 60);
        if conflict_backoff_seed.is_zero() || conflict_backoff_max < conflict_backoff_seed {
            return Err(Error::Config(
                "CONFLICT_BACKOFF_SEED_SECS must be > 0 and <= CONFLICT_BACKOFF_MAX_SECS"
                    .to_string(),
            ));
        }

        let telegram_message_limit = parse_or(get("TELEGRAM_MESSAGE_LIMIT"), 4096usize);
        if telegram_message_limit == 0 {
            return Err(Error::Config(
                "TELEGRAM_MESSAGE_LIMIT must be > 0".to_string(),
            ));
        }

        let poll_ttl = match parse_or(get("POLL_TTL_HOURS"), 24u64) {
            0 => None,
            h => Some(Duration::from_secs(h * 3600)),
        };

        Ok(Self {
            telegram_bot_token,
            gemini_api_key,
            gemini_model,
            long_poll_timeout: secs("LONG_POLL_TIMEOUT_SECS", 60),
            conflict_backoff_seed,
            conflict_backoff_max,
            transient_retry_delay: secs("TRANSIENT_RETRY_SECS", 3),
            loop_pause: Duration::from_millis(parse_or(get("LOOP_PAUSE_MS"), 100)),
            quiz_timeout: secs("QUIZ_TIMEOUT_SECS", 30),
            chat_timeout: secs("CHAT_TIMEOUT_SECS", 60),
            send_timeout: secs("SEND_TIMEOUT_SECS", 30),
            telegram_message_limit,
            poll_ttl,
            bot_creator: get("BOT_CREATOR"),
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, unquote(v.trim()));
    }
    tracing::info!("loaded {}", path.display());
}

/// Strip optional surrounding quotes.
fn unquote(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return &val[1..val.len() - 1];
    }
    val
}

fn parse_or<T: std::str::FromStr>(v: Option<String>, default: T) -> T {
    v.and_then(|s| s.trim().parse::<T>().ok()).unwrap_or(default)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    const CREDS: [(&str, &str); 2] = [("TELEGRAM_BOT_TOKEN", "t"), ("GEMINI_API_KEY", "g")];

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::from_lookup(lookup(&CREDS)).unwrap();
        assert_eq!(cfg.gemini_model, "gemini-2.0-flash");
        assert_eq!(cfg.long_poll_timeout, Duration::from_secs(60));
        assert_eq!(cfg.conflict_backoff_seed, Duration::from_secs(5));
        assert_eq!(cfg.conflict_backoff_max, Duration::from_secs(60));
        assert_eq!(cfg.transient_retry_delay, Duration::from_secs(3));
        assert_eq!(cfg.loop_pause, Duration::from_millis(100));
        assert_eq!(cfg.quiz_timeout, Duration::from_secs(30));
        assert_eq!(cfg.chat_timeout, Duration::from_secs(60));
        assert_eq!(cfg.telegram_message_limit, 4096);
        assert_eq!(cfg.poll_ttl, Some(Duration::from_secs(24 * 3600)));
    }

    #[test]
    fn missing_credentials_are_fatal() {
        let err = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "g")])).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));

        let err = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "t")])).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        let err = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "  "),
            ("GEMINI_API_KEY", "g"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn zero_ttl_disables_eviction() {
        let mut pairs = CREDS.to_vec();
        pairs.push(("POLL_TTL_HOURS", "0"));
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.poll_ttl, None);
    }

    #[test]
    fn rejects_inverted_backoff_bounds() {
        let mut pairs = CREDS.to_vec();
        pairs.push(("CONFLICT_BACKOFF_SEED_SECS", "90"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn unquotes_dotenv_values() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("'abc'"), "abc");
        assert_eq!(unquote("abc"), "abc");
    }
}
