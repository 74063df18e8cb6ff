use std::sync::Arc;

use crate::dictionary::PathMap;
use crate::utils::LengthBounds;

pub mod executor;
pub mod observer;

pub use executor::{
    ExecutorBuildError, HttpRequestExecutor, RequestExecutor, CHUNK_SIZE, DEFAULT_TIMEOUT_SECS,
    SSE_MAX_SIZE,
};
pub use observer::{NoopProgress, ProbeProgress, ScanLogger, TracingLogger};

/// Failed requests tolerated within one run before the scan of a target is
/// abandoned. The check happens between path attempts, so the request that
/// crosses the threshold still completes.
pub const MAX_FAILED_COUNT: u32 = 20;

/// Hands the executor the proxy descriptor to route requests through, or
/// `None` for a direct connection. Implementations own the selection
/// strategy; the prober only consumes the result.
pub trait ProxyProvider: Send + Sync {
    fn get_proxy(&self) -> Option<String>;
}

/// Fixed proxy configuration handed down from the CLI or config file.
pub struct StaticProxyProvider {
    proxy: Option<String>,
}

impl StaticProxyProvider {
    pub fn new(proxy: Option<String>) -> Self {
        let proxy = proxy.filter(|p| !p.trim().is_empty());
        Self { proxy }
    }
}

impl ProxyProvider for StaticProxyProvider {
    fn get_proxy(&self) -> Option<String> {
        self.proxy.clone()
    }
}

/// Probes a dictionary of candidate paths under a base URL and collects the
/// ones whose response body contains the expected signature.
pub struct PathProber<E> {
    paths: PathMap,
    executor: E,
    progress: Arc<dyn ProbeProgress>,
    length_filter: Option<LengthBounds>,
    max_failed_count: u32,
    failed_count: u32,
}

impl<E: RequestExecutor> PathProber<E> {
    pub fn new(paths: PathMap, executor: E) -> Self {
        Self {
            paths,
            executor,
            progress: Arc::new(NoopProgress),
            length_filter: None,
            max_failed_count: MAX_FAILED_COUNT,
            failed_count: 0,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProbeProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Only treat bodies whose length falls inside the bounds as candidate
    /// matches. Disabled by default.
    pub fn with_length_filter(mut self, bounds: Option<LengthBounds>) -> Self {
        self.length_filter = bounds;
        self
    }

    pub fn with_max_failed_count(mut self, max_failed_count: u32) -> Self {
        self.max_failed_count = max_failed_count;
        self
    }

    /// Failed requests recorded by the last `probe` run.
    pub fn failed_count(&self) -> u32 {
        self.failed_count
    }

    /// True when the last run stopped before exhausting the dictionary.
    pub fn aborted(&self) -> bool {
        self.failed_count > self.max_failed_count
    }

    /// Probes every dictionary path under `base_url` in insertion order and
    /// returns the full URLs whose body contains the expected signature.
    ///
    /// The base URL is concatenated with each path as-is; callers make sure
    /// the base carries no trailing slash and paths start with one. Request
    /// failures are absorbed into the failure counter and never surface as
    /// errors; once the counter passes the threshold the remaining paths are
    /// skipped and the matches found so far are returned.
    pub async fn probe(&mut self, base_url: &str) -> Vec<String> {
        self.failed_count = 0;
        let mut detected: Vec<String> = Vec::new();
        for entry in self.paths.iter() {
            if self.failed_count > self.max_failed_count {
                break;
            }
            let full_url = format!("{}{}", base_url, entry.path);
            self.progress.on_probe(&full_url);
            match self.executor.fetch(&full_url).await {
                Some(body) => {
                    if let Some(bounds) = self.length_filter {
                        if !bounds.contains(body.len()) {
                            continue;
                        }
                    }
                    if contains_ignore_case(&body, &entry.signature) {
                        detected.push(full_url);
                    }
                }
                None => self.failed_count += 1,
            }
        }
        detected
    }
}

fn contains_ignore_case(body: &str, signature: &str) -> bool {
    body.to_lowercase().contains(&signature.to_lowercase())
}
