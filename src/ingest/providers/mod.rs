// src/ingest/providers/mod.rs
pub mod jsonl;

pub use jsonl::JsonLinesProvider;
