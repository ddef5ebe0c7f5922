// src/vision.rs
//! Image-analysis collaborator: text and object labels found in an attached image.
//!
//! The service itself is external. It receives `{"image": "<ref>"}` and answers
//! with `{"text": ..., "labels": ...}` where each field is either a string or a
//! list of strings.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

pub const ENV_VISION_ENDPOINT: &str = "VISION_ENDPOINT";

/// Lowercase, whitespace-joined words extracted from one image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageAnalysis {
    /// Text recognised in the image.
    pub text: String,
    /// Names of objects recognised in the image.
    pub labels: String,
}

#[async_trait::async_trait]
pub trait ImageAnalyzer: Send + Sync {
    async fn analyze(&self, image_ref: &str) -> Result<ImageAnalysis>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Words {
    List(Vec<String>),
    Joined(String),
}

impl Default for Words {
    fn default() -> Self {
        Words::Joined(String::new())
    }
}

impl Words {
    fn into_lower_joined(self) -> String {
        let parts: Vec<String> = match self {
            Words::List(v) => v,
            Words::Joined(s) => vec![s],
        };
        parts
            .iter()
            .flat_map(|p| p.split_whitespace())
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Deserialize)]
struct VisionResponse {
    #[serde(default)]
    text: Words,
    #[serde(default)]
    labels: Words,
}

/// Decode a service response body into an [`ImageAnalysis`].
pub fn parse_response(body: &str) -> Result<ImageAnalysis> {
    let resp: VisionResponse = serde_json::from_str(body).context("decoding vision response")?;
    Ok(ImageAnalysis {
        text: resp.text.into_lower_joined(),
        labels: resp.labels.into_lower_joined(),
    })
}

/// JSON-over-HTTP client for the image-analysis service.
#[derive(Clone)]
pub struct HttpImageAnalyzer {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpImageAnalyzer {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// `None` when `VISION_ENDPOINT` is unset or blank.
    pub fn from_env() -> Option<Self> {
        std::env::var(ENV_VISION_ENDPOINT)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(Self::new)
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

#[async_trait::async_trait]
impl ImageAnalyzer for HttpImageAnalyzer {
    async fn analyze(&self, image_ref: &str) -> Result<ImageAnalysis> {
        let body = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "image": image_ref }))
            .send()
            .await
            .context("vision request")?
            .error_for_status()
            .context("vision non-2xx")?
            .text()
            .await
            .context("vision body")?;
        parse_response(&body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_and_strings_are_joined_lowercase() {
        let a = parse_response(r#"{"text": ["BUY", "Bitcoin\nNOW"], "labels": "Coin  Rocket"}"#)
            .unwrap();
        assert_eq!(a.text, "buy bitcoin now");
        assert_eq!(a.labels, "coin rocket");
    }

    #[test]
    fn missing_fields_are_empty() {
        let a = parse_response("{}").unwrap();
        assert_eq!(a, ImageAnalysis::default());
        assert!(parse_response("[]").is_err());
    }
}
