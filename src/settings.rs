// src/settings.rs
//! Process settings from the environment (`.env` is loaded by the binary).

use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_FOLLOWING: &str = "44196397";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Log deliveries locally instead of posting to Discord.
    pub offline_mode: bool,
    /// Account ids whose tweets are processed.
    pub following_ids: Vec<String>,
    pub logs_webhook_url: String,
    pub tweets_webhook_url: String,
    pub possible_tweets_webhook_url: String,
    /// JSON-lines feed file; no polling loop when unset.
    pub feed_path: Option<PathBuf>,
    pub poll_interval_secs: u64,
    pub bind_addr: SocketAddr,
}

/// "true" / "1" / "t" (any case) → true.
fn parse_flag(raw: Option<String>, default: bool) -> bool {
    match raw {
        Some(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "t"),
        None => default,
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup (tests pass a map instead of touching the process env).
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let following_ids = get("TWITTER_USER_IDS_TO_FOLLOW")
            .unwrap_or_else(|| DEFAULT_FOLLOWING.to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let poll_interval_secs = match get("POLL_INTERVAL_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("POLL_INTERVAL_SECS `{v}`: {e}"))?
                .max(1),
            None => DEFAULT_POLL_INTERVAL_SECS,
        };

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| anyhow::anyhow!("BIND_ADDR `{bind_raw}`: {e}"))?;

        Ok(Self {
            offline_mode: parse_flag(get("OFFLINE_MODE"), true),
            following_ids,
            logs_webhook_url: get("DISCORD_LOGS_WEBHOOK_URL").unwrap_or_default(),
            tweets_webhook_url: get("DISCORD_TWEETS_WEBHOOK_URL").unwrap_or_default(),
            possible_tweets_webhook_url: get("DISCORD_POSSIBLE_TWEETS_WEBHOOK_URL")
                .unwrap_or_default(),
            feed_path: get("FEED_PATH")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            poll_interval_secs,
            bind_addr,
        })
    }
}
