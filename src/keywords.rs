// src/keywords.rs
//! Keyword lists: loading, normalization and the shared read-only handle.
//!
//! The configuration is loaded once at startup and handed to every scan as an
//! `Arc<KeywordConfig>` snapshot. A reload replaces the whole object; scans
//! already running keep the snapshot they started with.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

use crate::matcher::EditPolicy;

pub const ENV_KEYWORDS_PATH: &str = "KEYWORDS_PATH";
pub const ENV_KEYWORDS_HOT_RELOAD: &str = "KEYWORDS_HOT_RELOAD";

const FALLBACK_PATHS: [&str; 3] = [
    "config/keywords.toml",
    "config/keywords.json",
    "keywords.json",
];

/// Immutable keyword configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordConfig {
    /// High-confidence keywords (strong highlight).
    pub definite: Vec<String>,
    /// Low-confidence keywords (weak highlight).
    pub possible: Vec<String>,
    /// Matched only against object labels extracted from images.
    pub possible_objects: Vec<String>,
    pub policy: EditPolicy,
    /// Remove `@handle` tokens before scanning.
    pub strip_mentions: bool,
}

/// On-disk shape. Accepts the legacy `keywords` / `possible_keywords` names.
#[derive(Debug, Deserialize)]
struct RawKeywords {
    #[serde(default, alias = "keywords")]
    definite: Vec<String>,
    #[serde(default, alias = "possible_keywords")]
    possible: Vec<String>,
    #[serde(default)]
    possible_objects: Vec<String>,
    #[serde(default)]
    policy: Option<EditPolicy>,
    #[serde(default)]
    strip_mentions: bool,
}

impl From<RawKeywords> for KeywordConfig {
    fn from(raw: RawKeywords) -> Self {
        Self {
            definite: clean_list(raw.definite),
            possible: clean_list(raw.possible),
            possible_objects: clean_list(raw.possible_objects),
            policy: raw.policy.unwrap_or_default(),
            strip_mentions: raw.strip_mentions,
        }
    }
}

impl KeywordConfig {
    /// Build from plain lists (normalized the same way as file input).
    pub fn new<D, P, S>(definite: D, possible: P) -> Self
    where
        D: IntoIterator<Item = S>,
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            definite: clean_list(definite.into_iter().map(Into::into).collect()),
            possible: clean_list(possible.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn with_possible_objects<I, S>(mut self, objects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.possible_objects = clean_list(objects.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_policy(mut self, policy: EditPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_strip_mentions(mut self, on: bool) -> Self {
        self.strip_mentions = on;
        self
    }

    /// Parse TOML or JSON content. `hint_ext` is the file extension, if known.
    pub fn from_str_hint(content: &str, hint_ext: &str) -> Result<Self> {
        let try_toml_first = hint_ext.eq_ignore_ascii_case("toml");
        if try_toml_first {
            if let Ok(raw) = toml::from_str::<RawKeywords>(content) {
                return Ok(raw.into());
            }
        }
        match serde_json::from_str::<RawKeywords>(content) {
            Ok(raw) => Ok(raw.into()),
            Err(json_err) => {
                if !try_toml_first {
                    if let Ok(raw) = toml::from_str::<RawKeywords>(content) {
                        return Ok(raw.into());
                    }
                }
                Err(anyhow!("unsupported keyword file format: {json_err}"))
            }
        }
    }

    /// Load from an explicit path (`.toml` or `.json`).
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading keywords from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let cfg = Self::from_str_hint(&content, ext)
            .with_context(|| format!("parsing keywords in {}", path.display()))?;
        info!(
            target: "keywords",
            path = %path.display(),
            definite = cfg.definite.len(),
            possible = cfg.possible.len(),
            possible_objects = cfg.possible_objects.len(),
            "keywords loaded"
        );
        Ok(cfg)
    }

    /// Load using `$KEYWORDS_PATH`, then `config/keywords.toml`,
    /// `config/keywords.json` and `./keywords.json`.
    pub fn load_default() -> Result<Self> {
        Self::from_path(&resolve_default_path()?)
    }

    pub fn is_empty(&self) -> bool {
        self.definite.is_empty() && self.possible.is_empty() && self.possible_objects.is_empty()
    }
}

/// Path the default loader would read.
pub fn resolve_default_path() -> Result<PathBuf> {
    if let Ok(p) = std::env::var(ENV_KEYWORDS_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(pb);
        }
        return Err(anyhow!(
            "{ENV_KEYWORDS_PATH} points to non-existent path {}",
            pb.display()
        ));
    }
    FALLBACK_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("no keyword file found (set {ENV_KEYWORDS_PATH})"))
}

/// Trim + lowercase, drop empties and duplicates, keep first-seen order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|it| it.trim().to_lowercase())
        .filter(|it| !it.is_empty() && seen.insert(it.clone()))
        .collect()
}

/* ----------------------------
Shared handle + hot reload
---------------------------- */

/// Cheap-clone handle to the current configuration.
#[derive(Clone, Debug)]
pub struct KeywordHandle {
    inner: Arc<RwLock<Arc<KeywordConfig>>>,
}

impl KeywordHandle {
    pub fn new(cfg: KeywordConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(cfg))),
        }
    }

    /// Current configuration. The snapshot is unaffected by later swaps.
    pub fn snapshot(&self) -> Arc<KeywordConfig> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Replace the whole configuration.
    pub fn swap(&self, cfg: KeywordConfig) {
        let fresh = Arc::new(cfg);
        match self.inner.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
    }
}

/// Dev-only gate: KEYWORDS_HOT_RELOAD=1 and a debug build or APP_ENV in {local, development, dev}.
fn hot_reload_enabled() -> bool {
    let want = std::env::var(ENV_KEYWORDS_HOT_RELOAD)
        .ok()
        .is_some_and(|v| v == "1");
    if !want {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("APP_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// One hot-reload poll: swap in a freshly parsed configuration if the mtime of
/// `path` moved since the last poll. The first poll only records the mtime.
/// A file that fails to parse keeps the previous configuration.
/// Returns `true` when a new configuration was swapped in.
fn reload_if_changed(
    handle: &KeywordHandle,
    path: &Path,
    last_mtime: &mut Option<SystemTime>,
) -> bool {
    let Ok(mtime) = fs::metadata(path).and_then(|m| m.modified()) else {
        return false;
    };
    let changed = last_mtime.is_some_and(|prev| mtime != prev);
    if last_mtime.is_none() || changed {
        *last_mtime = Some(mtime);
    }
    if !changed {
        return false;
    }
    match KeywordConfig::from_path(path) {
        Ok(cfg) => {
            handle.swap(cfg);
            info!(target: "keywords", path = %path.display(), "keywords reloaded");
            true
        }
        Err(e) => {
            warn!(target: "keywords", error = ?e, "reload failed; keeping previous keywords");
            false
        }
    }
}

/// Poll `path` every 2s and swap in a freshly parsed configuration when its mtime changes.
/// Returns `false` (and spawns nothing) when hot reload is disabled.
pub fn start_hot_reload_thread(handle: KeywordHandle, path: PathBuf) -> bool {
    if !hot_reload_enabled() {
        return false;
    }

    thread::spawn(move || {
        let poll = Duration::from_secs(2);
        let mut last_mtime: Option<SystemTime> = None;
        loop {
            reload_if_changed(&handle, &path, &mut last_mtime);
            thread::sleep(poll);
        }
    });
    true
}
