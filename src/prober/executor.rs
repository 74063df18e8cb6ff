use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use super::observer::ScanLogger;
use super::ProxyProvider;

/// Read granularity for streaming responses.
pub const CHUNK_SIZE: usize = 1024;

/// Accumulation cap for streaming responses. The cap is checked after each
/// chunk, so the final buffer may overshoot by at most one chunk.
pub const SSE_MAX_SIZE: usize = 2048;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Issues a single probe request and returns the response text, or `None`
/// when the request failed or the status disqualifies the response.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<String>;
}

#[derive(Debug, Error)]
pub enum ExecutorBuildError {
    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Clone)]
pub struct HttpRequestExecutor {
    client: reqwest::Client,
    logger: Arc<dyn ScanLogger>,
}

impl HttpRequestExecutor {
    pub fn new(
        proxy: &dyn ProxyProvider,
        timeout: Duration,
        logger: Arc<dyn ScanLogger>,
    ) -> Result<Self, ExecutorBuildError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:95.0) Gecko/20100101 Firefox/95.0",
            ),
        );

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .danger_accept_invalid_hostnames(true)
            .danger_accept_invalid_certs(true);

        if let Some(proxy) = proxy.get_proxy() {
            let configured = reqwest::Proxy::all(proxy.clone()).map_err(|e| {
                ExecutorBuildError::ProxySetup {
                    proxy,
                    source: e,
                }
            })?;
            builder = builder.proxy(configured);
        }

        let client = builder
            .build()
            .map_err(|e| ExecutorBuildError::HttpClientBuild { source: e })?;
        Ok(Self { client, logger })
    }

    async fn try_fetch(&self, url: &str) -> Result<Option<String>, reqwest::Error> {
        let mut resp = self.client.get(url).send().await?;
        let status = resp.status();
        let is_event_stream = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .contains("text/event-stream");
        debug!(url = url, status = status.as_u16(), "probe response");

        if !is_event_stream {
            if status == StatusCode::OK {
                return resp.text().await.map(Some);
            }
            return Ok(None);
        }

        // An event stream can stay open indefinitely; read a bounded prefix
        // and hang up.
        let mut content: Vec<u8> = Vec::new();
        'read: while let Some(chunk) = resp.chunk().await? {
            for piece in chunk.chunks(CHUNK_SIZE) {
                content.extend_from_slice(piece);
                if content.len() > SSE_MAX_SIZE {
                    break 'read;
                }
            }
        }
        drop(resp);
        // The cutoff can land mid-character, so decode with replacement.
        Ok(Some(String::from_utf8_lossy(&content).into_owned()))
    }
}

#[async_trait]
impl RequestExecutor for HttpRequestExecutor {
    async fn fetch(&self, url: &str) -> Option<String> {
        match self.try_fetch(url).await {
            Ok(content) => content,
            Err(e) => {
                self.logger.log_error(url, &describe_error(&e));
                None
            }
        }
    }
}

fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_connect() {
        format!("connection error: {e}")
    } else {
        format!("request failed: {e}")
    }
}
