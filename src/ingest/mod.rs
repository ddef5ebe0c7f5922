// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{FeedProvider, Tweet};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_tweets_total", "Tweets fetched from feed providers.");
        describe_counter!(
            "feed_skipped_total",
            "Tweets skipped (not from a followed account, or empty)."
        );
        describe_counter!(
            "feed_provider_errors_total",
            "Feed provider fetch/parse errors."
        );
        describe_counter!(
            "feed_malformed_lines_total",
            "Feed lines that could not be decoded."
        );
    });
}

/// Normalize text: decode HTML entities, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

/// True if `tweet` was posted by one of `following`. An empty list follows everyone.
pub fn is_followed(tweet: &Tweet, following: &[String]) -> bool {
    following.is_empty() || following.iter().any(|id| id == &tweet.user_id)
}

/// Normalize every tweet and keep those from followed accounts with non-empty text.
/// Returns (kept, skipped_count).
pub fn normalize_and_filter(raw: Vec<Tweet>, following: &[String]) -> (Vec<Tweet>, usize) {
    let mut skipped = 0usize;
    let mut kept = Vec::with_capacity(raw.len());
    for mut tw in raw {
        tw.text = normalize_text(&tw.text);
        if tw.text.is_empty() || !is_followed(&tw, following) {
            skipped += 1;
            continue;
        }
        kept.push(tw);
    }
    (kept, skipped)
}

/// Fetch once from every provider. A failing provider is logged and counted; the rest still run.
pub async fn fetch_all(providers: &[Box<dyn FeedProvider>]) -> Vec<Tweet> {
    ensure_metrics_described();

    let mut raw = Vec::new();
    for p in providers {
        match p.fetch_latest().await {
            Ok(mut v) => raw.append(&mut v),
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, provider = p.name(), "provider error");
                counter!("feed_provider_errors_total").increment(1);
            }
        }
    }
    counter!("feed_tweets_total").increment(raw.len() as u64);
    raw
}
