// src/ingest/providers/jsonl.rs
//! Offline feed: one JSON-encoded [`Tweet`] per line.
//!
//! Each fetch returns only lines appended since the previous fetch, so a file
//! that another process keeps appending to behaves like a stream.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

use crate::ingest::types::{FeedProvider, Tweet};

#[derive(Debug)]
enum Source {
    File(PathBuf),
    Fixture(String),
}

#[derive(Debug)]
pub struct JsonLinesProvider {
    source: Source,
    consumed_lines: Mutex<usize>,
}

impl JsonLinesProvider {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
            consumed_lines: Mutex::new(0),
        }
    }

    pub fn from_fixture(content: &str) -> Self {
        Self {
            source: Source::Fixture(content.to_string()),
            consumed_lines: Mutex::new(0),
        }
    }

    async fn read_all(&self) -> Result<String> {
        match &self.source {
            Source::File(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading feed file {}", path.display())),
            Source::Fixture(s) => Ok(s.clone()),
        }
    }
}

/// Everything up to and including the last `\n`. A trailing line without
/// one may still be being written and is left for the next fetch.
fn complete_lines(content: &str) -> &str {
    match content.rfind('\n') {
        Some(i) => &content[..=i],
        None => "",
    }
}

/// Parse lines, skipping blanks. Malformed lines are logged and dropped.
pub fn parse_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<Tweet> {
    let mut out = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Tweet>(line) {
            Ok(t) => out.push(t),
            Err(e) => {
                warn!(target: "ingest", line = i, error = %e, "malformed feed line");
                counter!("feed_malformed_lines_total").increment(1);
            }
        }
    }
    out
}

#[async_trait]
impl FeedProvider for JsonLinesProvider {
    async fn fetch_latest(&self) -> Result<Vec<Tweet>> {
        let content = self.read_all().await?;
        let complete = match self.source {
            Source::File(_) => complete_lines(&content),
            Source::Fixture(_) => content.as_str(),
        };
        let total = complete.lines().count();

        let skip = {
            let mut consumed = self
                .consumed_lines
                .lock()
                .map_err(|_| anyhow::anyhow!("feed cursor lock poisoned"))?;
            // file was truncated or rotated: start over
            if total < *consumed {
                *consumed = 0;
            }
            let skip = *consumed;
            *consumed = total;
            skip
        };

        Ok(parse_lines(complete.lines().skip(skip)))
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
{"id":"1","user_id":"12345","screen_name":"ghost","text":"I am a tweet containing a BITCOin reference"}
not json at all
{"id":"2","user_id":"12345","text":"I refer to etherium","media":["https://img.example/1.png"]}
"#;

    #[tokio::test]
    async fn fixture_is_read_once() {
        let p = JsonLinesProvider::from_fixture(FIXTURE);
        let first = p.fetch_latest().await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].screen_name, "ghost");
        assert!(first[0].media.is_empty());
        assert_eq!(first[1].media, vec!["https://img.example/1.png"]);

        let second = p.fetch_latest().await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn file_tail_returns_appended_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.jsonl");
        std::fs::write(&path, "{\"id\":\"1\",\"user_id\":\"u\",\"text\":\"a\"}\n").unwrap();

        let p = JsonLinesProvider::from_path(&path);
        assert_eq!(p.fetch_latest().await.unwrap().len(), 1);

        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{\"id\":\"2\",\"user_id\":\"u\",\"text\":\"b\"}\n");
        std::fs::write(&path, content).unwrap();

        let next = p.fetch_latest().await.unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].id, "2");
    }

    #[tokio::test]
    async fn partial_last_line_waits_for_the_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.jsonl");
        let first = "{\"id\":\"1\",\"user_id\":\"u\",\"text\":\"a\"}\n";
        std::fs::write(&path, format!("{first}{{\"id\":\"2\",\"user_id\":\"u\",")).unwrap();

        let p = JsonLinesProvider::from_path(&path);
        let got = p.fetch_latest().await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, "1");

        std::fs::write(
            &path,
            format!("{first}{{\"id\":\"2\",\"user_id\":\"u\",\"text\":\"b\"}}\n"),
        )
        .unwrap();
        let next = p.fetch_latest().await.unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].id, "2");
        assert!(p.fetch_latest().await.unwrap().is_empty());
    }

    #[test]
    fn complete_lines_stops_at_last_newline() {
        assert_eq!(complete_lines("a\nb\nc"), "a\nb\n");
        assert_eq!(complete_lines("a\n"), "a\n");
        assert_eq!(complete_lines("partial"), "");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let p = JsonLinesProvider::from_path("/definitely/not/here.jsonl");
        assert!(p.fetch_latest().await.is_err());
    }
}
