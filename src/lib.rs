// src/lib.rs
// Public library surface for the binary and integration tests.

// Classification core
pub mod annotate;
pub mod classify;
pub mod keywords;
pub mod matcher;
pub mod overlap;

// Record processing and collaborators
pub mod dispatch;
pub mod ingest;
pub mod notify;
pub mod vision;
pub mod watcher;

// Service plumbing
pub mod api;
pub mod metrics;
pub mod settings;

// ---- Re-exports for stable public API ----
pub use crate::annotate::{annotate, compose, Style};
pub use crate::classify::{classify_labels, classify_text, Classification, Outcome, Verdict};
pub use crate::keywords::{KeywordConfig, KeywordHandle};
pub use crate::matcher::{scan, EditPolicy, Match, MatchSet};
pub use crate::overlap::resolve;
pub use crate::watcher::{RecordReport, Watcher};
