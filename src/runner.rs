use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::time::Instant;

use crate::dictionary::{DictionaryError, PathMap};
use crate::prober::{
    ExecutorBuildError, HttpRequestExecutor, NoopProgress, PathProber, ProbeProgress, ScanLogger,
    StaticProxyProvider, TracingLogger, DEFAULT_TIMEOUT_SECS, MAX_FAILED_COUNT,
};
use crate::utils::{self, LengthBounds};

#[derive(Clone, Debug)]
pub enum DictionarySource {
    FilePath(String),
    Inline(PathMap),
    Builtin,
}

#[derive(Clone, Debug)]
pub struct Options {
    pub urls: Vec<String>,
    pub input_file: Option<String>,
    pub dictionary: DictionarySource,
    pub proxy: Option<String>,
    pub timeout_seconds: u64,
    pub max_failed_count: u32,
    pub length_filter: Option<LengthBounds>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            input_file: None,
            dictionary: DictionarySource::Builtin,
            proxy: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            max_failed_count: MAX_FAILED_COUNT,
            length_filter: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no targets provided (urls and input_file are both empty)")]
    NoTargets,

    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("invalid timeout, expected positive integer")]
    InvalidTimeout,

    #[error("dictionary is empty")]
    EmptyDictionary,

    #[error(transparent)]
    Dictionary(#[from] DictionaryError),

    #[error(transparent)]
    Executor(#[from] ExecutorBuildError),

    #[error("failed to open file for {kind}: {path}: {source}")]
    FileOpen {
        kind: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read lines for {kind}: {path}: {source}")]
    FileRead {
        kind: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug)]
pub struct TargetUrl {
    pub original: String,
    pub normalized: String,
}

#[derive(Clone, Debug)]
pub struct TargetReport {
    pub base_url: String,
    pub detected: Vec<String>,
    pub failed_count: u32,
    pub aborted: bool,
}

#[derive(Clone, Debug)]
pub struct ScanReport {
    pub elapsed: Duration,
    pub paths_total: usize,
    pub targets: Vec<TargetReport>,
}

#[derive(Clone, Debug)]
pub struct Runner {
    options: Options,
}

impl Runner {
    pub fn new(options: Options) -> Result<Self, ScanError> {
        if options.urls.is_empty() && options.input_file.is_none() {
            return Err(ScanError::NoTargets);
        }
        if options.timeout_seconds == 0 {
            return Err(ScanError::InvalidTimeout);
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn load_dictionary(&self) -> Result<PathMap, ScanError> {
        let paths = match &self.options.dictionary {
            DictionarySource::FilePath(path) => PathMap::load(Path::new(path))?,
            DictionarySource::Inline(map) => map.clone(),
            DictionarySource::Builtin => PathMap::builtin(),
        };
        if paths.is_empty() {
            return Err(ScanError::EmptyDictionary);
        }
        Ok(paths)
    }

    pub async fn load_targets(&self) -> Result<Vec<TargetUrl>, ScanError> {
        let targets = load_targets(&self.options.urls, self.options.input_file.as_deref()).await?;
        if targets.is_empty() {
            return Err(ScanError::NoTargets);
        }
        for t in targets.iter() {
            if reqwest::Url::parse(&t.original).is_err() {
                return Err(ScanError::InvalidUrl {
                    url: t.original.clone(),
                });
            }
        }
        Ok(targets)
    }

    pub async fn run(&self) -> Result<ScanReport, ScanError> {
        self.run_with(Arc::new(NoopProgress), Arc::new(TracingLogger))
            .await
    }

    /// Scans every target sequentially with one independent prober per
    /// target, so failure counters never leak across targets.
    pub async fn run_with(
        &self,
        progress: Arc<dyn ProbeProgress>,
        logger: Arc<dyn ScanLogger>,
    ) -> Result<ScanReport, ScanError> {
        let started_at = Instant::now();

        let paths = self.load_dictionary()?;
        let targets = self.load_targets().await?;

        let provider = StaticProxyProvider::new(self.options.proxy.clone());
        let timeout = Duration::from_secs(self.options.timeout_seconds);
        let executor = HttpRequestExecutor::new(&provider, timeout, logger)?;

        let mut reports: Vec<TargetReport> = Vec::with_capacity(targets.len());
        for target in targets.iter() {
            let mut prober = PathProber::new(paths.clone(), executor.clone())
                .with_progress(progress.clone())
                .with_max_failed_count(self.options.max_failed_count)
                .with_length_filter(self.options.length_filter);
            let detected = prober.probe(&target.normalized).await;
            reports.push(TargetReport {
                base_url: target.original.clone(),
                detected,
                failed_count: prober.failed_count(),
                aborted: prober.aborted(),
            });
        }

        Ok(ScanReport {
            elapsed: started_at.elapsed(),
            paths_total: paths.len(),
            targets: reports,
        })
    }
}

/// Dictionary paths carry the leading slash, so the base must not end with
/// one. The original spelling is kept for display.
pub fn normalize_base_url(url: &str) -> TargetUrl {
    let original = utils::trim_url(url);
    let mut normalized = original.clone();
    while normalized.ends_with('/') {
        normalized.pop();
    }
    TargetUrl {
        original,
        normalized,
    }
}

async fn load_targets(
    urls: &[String],
    input_file: Option<&str>,
) -> Result<Vec<TargetUrl>, ScanError> {
    let mut targets: Vec<TargetUrl> = Vec::new();
    for url in urls.iter() {
        let target = normalize_base_url(url);
        if !target.original.is_empty() {
            targets.push(target);
        }
    }

    if let Some(path) = input_file {
        let handle = File::open(path).await.map_err(|e| ScanError::FileOpen {
            kind: "targets",
            path: path.to_string(),
            source: e,
        })?;
        let buf = BufReader::new(handle);
        let mut lines = buf.lines();
        loop {
            let line = lines.next_line().await.map_err(|e| ScanError::FileRead {
                kind: "targets",
                path: path.to_string(),
                source: e,
            })?;
            let Some(line) = line else {
                break;
            };
            let target = normalize_base_url(&line);
            if !target.original.is_empty() {
                targets.push(target);
            }
        }
    }

    Ok(targets)
}
