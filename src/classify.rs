// src/classify.rs
//! Per-text pipeline: lowercase → scan → resolve → annotate.
//!
//! Pure functions of `(KeywordConfig, text)`. Total for any UTF-8 input,
//! including empty text and empty keyword lists.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotate::{annotate, compose, Style};
use crate::keywords::KeywordConfig;
use crate::matcher::{scan, strip_mentions, EditPolicy, MatchSet};
use crate::overlap::resolve;

/// How strongly a text relates to the watched topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    None,
    Possible,
    Definite,
}

impl Verdict {
    /// Definite matches take priority over possible ones.
    pub fn from_sets(definite: &[crate::matcher::Match], possible: &[crate::matcher::Match]) -> Self {
        if !definite.is_empty() {
            Verdict::Definite
        } else if !possible.is_empty() {
            Verdict::Possible
        } else {
            Verdict::None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::None => "none",
            Verdict::Possible => "possible",
            Verdict::Definite => "definite",
        }
    }
}

/// Result handed to the delivery side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Definite(String),
    Possible(String),
    NoMatch,
}

/// Full result for one text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub verdict: Verdict,
    /// The text that was scanned (lowercased, maybe mention-stripped). All offsets refer to it.
    pub text: String,
    pub annotated: String,
    pub definite: MatchSet,
    pub possible: MatchSet,
}

impl Classification {
    pub fn outcome(&self) -> Outcome {
        match self.verdict {
            Verdict::Definite => Outcome::Definite(self.annotated.clone()),
            Verdict::Possible => Outcome::Possible(self.annotated.clone()),
            Verdict::None => Outcome::NoMatch,
        }
    }

    pub fn is_match(&self) -> bool {
        self.verdict != Verdict::None
    }
}

/// Lowercase and, if configured, drop `@handle` tokens.
pub fn prepare_text(cfg: &KeywordConfig, raw: &str) -> String {
    let lower = raw.to_lowercase();
    if cfg.strip_mentions {
        strip_mentions(&lower)
    } else {
        lower
    }
}

/// Scan one keyword list and remove conflicting matches.
pub fn scan_resolved(keywords: &[String], text: &str, policy: EditPolicy) -> MatchSet {
    resolve(scan(keywords, text, policy))
}

/// Classify message (or image) text against the `definite` and `possible` lists.
pub fn classify_text(cfg: &KeywordConfig, raw: &str) -> Classification {
    let text = prepare_text(cfg, raw);
    let definite = scan_resolved(&cfg.definite, &text, cfg.policy);
    let possible = scan_resolved(&cfg.possible, &text, cfg.policy);
    let verdict = Verdict::from_sets(&definite, &possible);
    let annotated = compose(&text, &definite, &possible);

    log_classification("text", &text, verdict, &definite, &possible);
    Classification {
        verdict,
        text,
        annotated,
        definite,
        possible,
    }
}

/// Classify image object labels against `possible_objects` only. Never yields `Definite`.
pub fn classify_labels(cfg: &KeywordConfig, raw_labels: &str) -> Classification {
    let text = raw_labels.to_lowercase();
    let possible = scan_resolved(&cfg.possible_objects, &text, cfg.policy);
    let verdict = Verdict::from_sets(&[], &possible);
    let annotated = annotate(&text, &possible, Style::Weak);

    log_classification("labels", &text, verdict, &[], &possible);
    Classification {
        verdict,
        text,
        annotated,
        definite: Vec::new(),
        possible,
    }
}

pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn keywords_of(ms: &[crate::matcher::Match]) -> Vec<&str> {
    ms.iter().map(|m| m.keyword.as_str()).collect()
}

fn log_classification(
    kind: &str,
    text: &str,
    verdict: Verdict,
    definite: &[crate::matcher::Match],
    possible: &[crate::matcher::Match],
) {
    debug!(
        target: "classify",
        id = %anon_hash(text),
        kind,
        verdict = verdict.as_str(),
        definite = ?keywords_of(definite),
        possible = ?keywords_of(possible),
        "classified"
    );
}
