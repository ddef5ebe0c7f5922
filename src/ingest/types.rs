// src/ingest/types.rs
use anyhow::Result;

/// One message from the feed.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Tweet {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub screen_name: String,
    pub text: String,
    /// Attached image references (URLs).
    #[serde(default)]
    pub media: Vec<String>,
}

#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    /// Messages that arrived since the previous call.
    async fn fetch_latest(&self) -> Result<Vec<Tweet>>;
    fn name(&self) -> &'static str;
}
