//! Tweet notifier: binary entrypoint.
//! Loads keywords, starts the feed polling loop (when a feed is configured)
//! and serves the HTTP API.

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tweet_notifier::api::{self, AppState};
use tweet_notifier::dispatch::{spawn_polling, Dispatcher};
use tweet_notifier::ingest::{self, providers::JsonLinesProvider, types::FeedProvider};
use tweet_notifier::keywords::{resolve_default_path, start_hot_reload_thread};
use tweet_notifier::metrics::Metrics;
use tweet_notifier::notify::DeliveryRouter;
use tweet_notifier::settings::Settings;
use tweet_notifier::vision::HttpImageAnalyzer;
use tweet_notifier::{KeywordConfig, KeywordHandle, Watcher};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tweet_notifier=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = Settings::from_env()?;

    let keywords_path = resolve_default_path()?;
    let cfg = KeywordConfig::from_path(&keywords_path)?;
    let keyword_count = cfg.definite.len() + cfg.possible.len() + cfg.possible_objects.len();
    let handle = KeywordHandle::new(cfg);
    if start_hot_reload_thread(handle.clone(), keywords_path.clone()) {
        info!(path = %keywords_path.display(), "keyword hot reload enabled");
    }

    let metrics = match Metrics::init(keyword_count) {
        Ok(m) => {
            ingest::ensure_metrics_described();
            Some(m)
        }
        Err(e) => {
            warn!(error = ?e, "metrics disabled");
            None
        }
    };

    let mut watcher = Watcher::new(handle.clone());
    if let Some(vision) = HttpImageAnalyzer::from_env() {
        info!("image analysis enabled");
        watcher = watcher.with_vision(Arc::new(vision));
    }

    let router = DeliveryRouter::from_settings(&settings);
    let _poller = match &settings.feed_path {
        Some(path) => {
            let providers: Vec<Box<dyn FeedProvider>> =
                vec![Box::new(JsonLinesProvider::from_path(path.clone()))];
            let dispatcher = Dispatcher::new(watcher, router, settings.following_ids.clone());
            info!(
                feed = %path.display(),
                interval_secs = settings.poll_interval_secs,
                offline = settings.offline_mode,
                "feed polling started"
            );
            Some(spawn_polling(dispatcher, providers, settings.poll_interval_secs))
        }
        None => {
            info!("FEED_PATH not set; serving the API only");
            None
        }
    };

    let state = AppState { keywords: handle };
    let app = match &metrics {
        Some(m) => api::router_with_metrics(state, m),
        None => api::router(state),
    };

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("bind {}", settings.bind_addr))?;
    info!(addr = %settings.bind_addr, "listening");
    axum::serve(listener, app).await.context("http server")?;
    Ok(())
}
