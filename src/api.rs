// src/api.rs
//! HTTP surface: health, on-demand classification and (optionally) metrics.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::classify::{classify_text, Verdict};
use crate::keywords::KeywordHandle;
use crate::matcher::MatchSet;
use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub keywords: KeywordHandle,
}

#[derive(Debug, Deserialize)]
struct ClassifyReq {
    text: String,
}

#[derive(Debug, Serialize)]
struct ClassifyResp {
    verdict: Verdict,
    annotated: String,
    definite: MatchSet,
    possible: MatchSet,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/classify", post(classify))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// `router` plus `/metrics`.
pub fn router_with_metrics(state: AppState, metrics: &Metrics) -> Router {
    router(state).merge(metrics.router())
}

async fn classify(State(state): State<AppState>, Json(body): Json<ClassifyReq>) -> Json<ClassifyResp> {
    let cfg = state.keywords.snapshot();
    let c = classify_text(&cfg, &body.text);
    Json(ClassifyResp {
        verdict: c.verdict,
        annotated: c.annotated,
        definite: c.definite,
        possible: c.possible,
    })
}
