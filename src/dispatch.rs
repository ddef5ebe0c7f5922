// src/dispatch.rs
//! Per-message loop: fetch → filter → classify → deliver.
//!
//! Provider and delivery failures are logged and counted; the loop keeps
//! running, which is what makes the polling feed self-healing.

use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::classify::Verdict;
use crate::ingest::{self, types::FeedProvider};
use crate::notify::{Delivery, DeliveryRouter};
use crate::watcher::Watcher;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub seen: usize,
    pub skipped: usize,
    pub definite: usize,
    pub possible: usize,
    pub none: usize,
    pub delivered: usize,
}

#[derive(Clone)]
pub struct Dispatcher {
    watcher: Watcher,
    router: DeliveryRouter,
    following: Vec<String>,
}

impl Dispatcher {
    pub fn new(watcher: Watcher, router: DeliveryRouter, following: Vec<String>) -> Self {
        Self {
            watcher,
            router,
            following,
        }
    }

    pub async fn run_once(&self, providers: &[Box<dyn FeedProvider>]) -> DispatchSummary {
        let raw = ingest::fetch_all(providers).await;
        let seen = raw.len();
        let (tweets, skipped) = ingest::normalize_and_filter(raw, &self.following);
        if skipped > 0 {
            metrics::counter!("feed_skipped_total").increment(skipped as u64);
        }

        let mut summary = DispatchSummary {
            seen,
            skipped,
            ..DispatchSummary::default()
        };

        for tweet in &tweets {
            debug!(target: "dispatch", tweet = %tweet.id, user = %tweet.screen_name, text = %tweet.text, "processing");
            let report = self.watcher.process(tweet).await;
            match report.verdict {
                Verdict::Definite => summary.definite += 1,
                Verdict::Possible => summary.possible += 1,
                Verdict::None => summary.none += 1,
            }
            if self.router.deliver(&Delivery::from_report(tweet, &report)).await {
                summary.delivered += 1;
            }
        }

        if summary.seen > 0 {
            info!(
                target: "dispatch",
                seen = summary.seen,
                skipped = summary.skipped,
                definite = summary.definite,
                possible = summary.possible,
                none = summary.none,
                delivered = summary.delivered,
                "dispatch tick"
            );
        }
        summary
    }
}

/// Run `run_once` every `interval_secs` until the task is aborted.
pub fn spawn_polling(
    dispatcher: Dispatcher,
    providers: Vec<Box<dyn FeedProvider>>,
    interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            dispatcher.run_once(&providers).await;
        }
    })
}
