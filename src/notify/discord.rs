// src/notify/discord.rs
use super::{Delivery, Notifier};
use crate::annotate::Style;
use anyhow::{anyhow, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

/// Discord caps message content at 2000 characters.
const DISCORD_CONTENT_LIMIT: usize = 2000;

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    username: Option<String>,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            username: None,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    /// Name shown as the webhook author (e.g. "tweets", "possible_tweets").
    pub fn with_username(mut self, name: impl Into<String>) -> Self {
        self.username = Some(name.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    async fn post(&self, payload: &DiscordWebhookPayload) -> Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await;

            let (err, retryable) = match res {
                Ok(rsp) if rsp.status().is_success() => return Ok(()),
                Ok(rsp) => {
                    let status = rsp.status();
                    (
                        anyhow!("Discord webhook HTTP error: {status}"),
                        is_retryable(status),
                    )
                }
                Err(e) => (anyhow!("Discord webhook request failed: {e}"), true),
            };

            if !retryable || attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(target: "notify", attempt, error = %err, "discord retry");
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}

/// Server errors and rate limiting may clear up; other 4xx responses will not.
fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, delivery: &Delivery) -> Result<()> {
        let payload = DiscordWebhookPayload::message(
            &render_content(delivery),
            self.username.as_deref(),
        );
        self.post(&payload).await
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

/// Message body: a header line with the author, then the annotated text.
pub fn render_content(delivery: &Delivery) -> String {
    let header = if delivery.screen_name.is_empty() {
        format!("tweet {}", delivery.tweet_id)
    } else {
        format!("@{} (tweet {})", delivery.screen_name, delivery.tweet_id)
    };
    truncate_chars(
        &format!("{header}\n{}", delivery.annotated),
        DISCORD_CONTENT_LIMIT,
    )
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    if let Some(cut) = unclosed_marker_start(&out) {
        out.truncate(cut);
    }
    out.push('…');
    out
}

/// Byte offset of the first highlight marker in `s` that is never closed.
fn unclosed_marker_start(s: &str) -> Option<usize> {
    let mut open: Vec<(Style, usize)> = Vec::new();
    let mut i = 0;
    while i < s.len() {
        let rest = &s[i..];
        let top = open.last().map(|&(style, _)| style);
        let step = if top == Some(Style::Strong) && rest.starts_with(Style::Strong.close()) {
            open.pop();
            Style::Strong.close().len()
        } else if rest.starts_with(Style::Strong.open()) {
            open.push((Style::Strong, i));
            Style::Strong.open().len()
        } else if top == Some(Style::Weak) && rest.starts_with(Style::Weak.close()) {
            open.pop();
            Style::Weak.close().len()
        } else if rest.starts_with(Style::Weak.open()) {
            open.push((Style::Weak, i));
            Style::Weak.open().len()
        } else {
            rest.chars().next().map_or(1, char::len_utf8)
        };
        i += step;
    }
    open.first().map(|&(_, at)| at)
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
}

impl DiscordWebhookPayload {
    fn message(content: &str, username: Option<&str>) -> Self {
        Self {
            content: content.to_string(),
            username: username.map(str::to_string),
        }
    }
}
