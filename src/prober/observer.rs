use tracing::error;

/// Receives one callback per attempted path, before the request goes out.
/// The CLI installs a progress-bar implementation; the default does nothing.
pub trait ProbeProgress: Send + Sync {
    fn on_probe(&self, url: &str);
}

pub struct NoopProgress;

impl ProbeProgress for NoopProgress {
    fn on_probe(&self, _url: &str) {}
}

/// Sink for request-level failures. Injected rather than reached through a
/// process-global so library users control where failures go.
pub trait ScanLogger: Send + Sync {
    fn log_error(&self, url: &str, detail: &str);
}

/// Emits failures as structured tracing events.
pub struct TracingLogger;

impl ScanLogger for TracingLogger {
    fn log_error(&self, url: &str, detail: &str) {
        error!(url = url, "{}", detail);
    }
}
