// src/notify/mod.rs
//! Delivery of classified records to notification channels.
//!
//! Definite records go to the tweets channel, possible ones to the
//! possible-tweets channel and non-matching ones to the logs channel (if any).
//! Sinks own their retry policy; failures are logged and counted here and
//! never reach the classifier.

pub mod discord;

use anyhow::Result;
use metrics::counter;
use std::sync::Arc;
use tracing::{info, warn};

use crate::classify::Verdict;
use crate::ingest::types::Tweet;
use crate::settings::Settings;
use crate::watcher::RecordReport;

pub use discord::DiscordNotifier;

/// What a sink receives: the verdict tag and the fully annotated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub verdict: Verdict,
    pub annotated: String,
    pub tweet_id: String,
    pub screen_name: String,
}

impl Delivery {
    pub fn from_report(tweet: &Tweet, report: &RecordReport) -> Self {
        Self {
            verdict: report.verdict,
            annotated: report.annotated.clone(),
            tweet_id: tweet.id.clone(),
            screen_name: tweet.screen_name.clone(),
        }
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, delivery: &Delivery) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Offline sink: writes the delivery to the log and never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, delivery: &Delivery) -> Result<()> {
        info!(
            target: "notify",
            verdict = delivery.verdict.as_str(),
            tweet = %delivery.tweet_id,
            "{}",
            delivery.annotated
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Routes each verdict to its channel.
#[derive(Clone, Default)]
pub struct DeliveryRouter {
    definite: Option<Arc<dyn Notifier>>,
    possible: Option<Arc<dyn Notifier>>,
    logs: Option<Arc<dyn Notifier>>,
}

impl DeliveryRouter {
    pub fn new(
        definite: Option<Arc<dyn Notifier>>,
        possible: Option<Arc<dyn Notifier>>,
        logs: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            definite,
            possible,
            logs,
        }
    }

    /// Every channel logs locally; nothing leaves the process.
    pub fn offline() -> Self {
        let log: Arc<dyn Notifier> = Arc::new(LogNotifier);
        Self::new(Some(log.clone()), Some(log), None)
    }

    /// Discord channels for every configured webhook; `offline()` in offline mode.
    pub fn from_settings(settings: &Settings) -> Self {
        if settings.offline_mode {
            return Self::offline();
        }
        let hook = |url: &str, name: &str| -> Option<Arc<dyn Notifier>> {
            if url.trim().is_empty() {
                None
            } else {
                Some(Arc::new(
                    DiscordNotifier::new(url.to_string()).with_username(name),
                ))
            }
        };
        Self::new(
            hook(&settings.tweets_webhook_url, "tweets"),
            hook(&settings.possible_tweets_webhook_url, "possible_tweets"),
            hook(&settings.logs_webhook_url, "logs"),
        )
    }

    fn channel_for(&self, verdict: Verdict) -> Option<&Arc<dyn Notifier>> {
        match verdict {
            Verdict::Definite => self.definite.as_ref(),
            Verdict::Possible => self.possible.as_ref(),
            Verdict::None => self.logs.as_ref(),
        }
    }

    /// Send to the matching channel. Returns true if a sink accepted it.
    pub async fn deliver(&self, delivery: &Delivery) -> bool {
        let Some(sink) = self.channel_for(delivery.verdict) else {
            tracing::debug!(
                target: "notify",
                verdict = delivery.verdict.as_str(),
                "no channel configured"
            );
            return false;
        };

        match sink.send(delivery).await {
            Ok(()) => {
                counter!("deliveries_total", "verdict" => delivery.verdict.as_str()).increment(1);
                true
            }
            Err(e) => {
                warn!(
                    target: "notify",
                    sink = sink.name(),
                    tweet = %delivery.tweet_id,
                    error = ?e,
                    "delivery failed"
                );
                counter!("delivery_errors_total").increment(1);
                false
            }
        }
    }
}
