// src/watcher.rs
//! Record-level processing: the tweet body plus, optionally, every attached image.
//!
//! Image text goes through the same pipeline as the body; object labels are
//! scanned against `possible_objects` only. The strongest segment verdict
//! decides the record's outcome.

use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::classify::{anon_hash, classify_labels, classify_text, Classification, Outcome, Verdict};
use crate::ingest::types::Tweet;
use crate::keywords::KeywordHandle;
use crate::vision::ImageAnalyzer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentSource {
    Body,
    ImageText,
    ImageLabels,
}

#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub source: SegmentSource,
    pub classification: Classification,
}

/// Everything learned about one record.
#[derive(Debug, Clone, Serialize)]
pub struct RecordReport {
    pub tweet_id: String,
    pub verdict: Verdict,
    /// Annotated body, followed by each matching image segment on its own line.
    pub annotated: String,
    pub segments: Vec<Segment>,
}

impl RecordReport {
    pub fn outcome(&self) -> Outcome {
        match self.verdict {
            Verdict::Definite => Outcome::Definite(self.annotated.clone()),
            Verdict::Possible => Outcome::Possible(self.annotated.clone()),
            Verdict::None => Outcome::NoMatch,
        }
    }
}

#[derive(Clone)]
pub struct Watcher {
    keywords: KeywordHandle,
    vision: Option<Arc<dyn ImageAnalyzer>>,
}

impl Watcher {
    pub fn new(keywords: KeywordHandle) -> Self {
        Self {
            keywords,
            vision: None,
        }
    }

    pub fn with_vision(mut self, vision: Arc<dyn ImageAnalyzer>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn keywords(&self) -> &KeywordHandle {
        &self.keywords
    }

    /// Classify a bare text with the current keyword snapshot.
    pub fn classify(&self, text: &str) -> Classification {
        classify_text(&self.keywords.snapshot(), text)
    }

    pub async fn process(&self, tweet: &Tweet) -> RecordReport {
        // one snapshot for the whole record, even if a reload lands mid-way
        let cfg = self.keywords.snapshot();

        let mut segments = vec![Segment {
            source: SegmentSource::Body,
            classification: classify_text(&cfg, &tweet.text),
        }];

        if let Some(vision) = &self.vision {
            for image in &tweet.media {
                match vision.analyze(image).await {
                    Ok(found) => {
                        if !found.text.is_empty() {
                            segments.push(Segment {
                                source: SegmentSource::ImageText,
                                classification: classify_text(&cfg, &found.text),
                            });
                        }
                        if !found.labels.is_empty() {
                            segments.push(Segment {
                                source: SegmentSource::ImageLabels,
                                classification: classify_labels(&cfg, &found.labels),
                            });
                        }
                    }
                    Err(e) => {
                        warn!(
                            target: "watcher",
                            tweet = %tweet.id,
                            analyzer = vision.name(),
                            error = ?e,
                            "image analysis failed; image skipped"
                        );
                        counter!("vision_errors_total").increment(1);
                    }
                }
            }
        }

        let verdict = segments
            .iter()
            .map(|s| s.classification.verdict)
            .max()
            .unwrap_or(Verdict::None);

        let annotated = segments
            .iter()
            .enumerate()
            .filter(|(i, s)| *i == 0 || s.classification.is_match())
            .map(|(_, s)| s.classification.annotated.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        counter!("classify_total", "verdict" => verdict.as_str()).increment(1);
        info!(
            target: "watcher",
            tweet = %tweet.id,
            id = %anon_hash(&tweet.text),
            verdict = verdict.as_str(),
            segments = segments.len(),
            "record processed"
        );

        RecordReport {
            tweet_id: tweet.id.clone(),
            verdict,
            annotated,
            segments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::KeywordConfig;
    use crate::vision::ImageAnalysis;

    struct FixedVision(ImageAnalysis);

    #[async_trait::async_trait]
    impl ImageAnalyzer for FixedVision {
        async fn analyze(&self, _image_ref: &str) -> anyhow::Result<ImageAnalysis> {
            Ok(self.0.clone())
        }
        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct BrokenVision;

    #[async_trait::async_trait]
    impl ImageAnalyzer for BrokenVision {
        async fn analyze(&self, _image_ref: &str) -> anyhow::Result<ImageAnalysis> {
            anyhow::bail!("service down")
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn watcher() -> Watcher {
        let cfg = KeywordConfig::new(["bitcoin"], ["moon"]).with_possible_objects(["rocket"]);
        Watcher::new(KeywordHandle::new(cfg))
    }

    fn tweet(text: &str, media: &[&str]) -> Tweet {
        Tweet {
            id: "42".into(),
            user_id: "1".into(),
            screen_name: "ghost".into(),
            text: text.into(),
            media: media.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn body_only_without_vision() {
        let r = watcher().process(&tweet("Going to the Moon", &["img"])).await;
        assert_eq!(r.verdict, Verdict::Possible);
        assert_eq!(r.segments.len(), 1);
        assert_eq!(r.outcome(), Outcome::Possible("going to the __moon__".into()));
    }

    #[tokio::test]
    async fn image_text_can_raise_the_verdict() {
        let vision = FixedVision(ImageAnalysis {
            text: "buy bitcoin".into(),
            labels: "rocket person".into(),
        });
        let w = watcher().with_vision(Arc::new(vision));
        let r = w.process(&tweet("look at this", &["img"])).await;
        assert_eq!(r.verdict, Verdict::Definite);
        assert_eq!(r.segments.len(), 3);
        assert_eq!(
            r.annotated,
            "look at this\nbuy __**bitcoin**__\n__rocket__ person"
        );
    }

    #[tokio::test]
    async fn labels_never_yield_definite() {
        let vision = FixedVision(ImageAnalysis {
            text: String::new(),
            labels: "bitcoin".into(),
        });
        let w = watcher().with_vision(Arc::new(vision));
        let r = w.process(&tweet("nothing", &["img"])).await;
        assert_eq!(r.verdict, Verdict::None);
        assert_eq!(r.annotated, "nothing");
    }

    #[tokio::test]
    async fn vision_failure_skips_the_image() {
        let w = watcher().with_vision(Arc::new(BrokenVision));
        let r = w.process(&tweet("bitcoin", &["a", "b"])).await;
        assert_eq!(r.verdict, Verdict::Definite);
        assert_eq!(r.segments.len(), 1);
    }
}
