use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::dictionary::PathMap;
use crate::prober::{PathProber, RequestExecutor};
use crate::runner::{DictionarySource, Options, Runner, ScanError};
use crate::utils::LengthBounds;

/// Replays canned responses keyed by URL; anything unknown is a failure.
#[derive(Clone)]
struct ScriptedExecutor {
    responses: Arc<HashMap<String, String>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedExecutor {
    fn new<const N: usize>(responses: [(&str, &str); N]) -> Self {
        let responses = responses
            .into_iter()
            .map(|(url, body)| (url.to_string(), body.to_string()))
            .collect();
        Self {
            responses: Arc::new(responses),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing() -> Self {
        Self::new([])
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RequestExecutor for ScriptedExecutor {
    async fn fetch(&self, url: &str) -> Option<String> {
        self.calls.lock().unwrap().push(url.to_string());
        self.responses.get(url).cloned()
    }
}

fn numbered_paths(count: usize) -> PathMap {
    PathMap::from_pairs((0..count).map(|i| (format!("/p{i}"), format!("sig{i}"))))
}

#[tokio::test]
async fn all_matching_paths_are_detected_in_mapping_order() {
    let paths = PathMap::from_pairs([("/a", "sig"), ("/b", "sig"), ("/c", "sig")]);
    let exec = ScriptedExecutor::new([
        ("http://h/a", "xx sig xx"),
        ("http://h/b", "xx sig xx"),
        ("http://h/c", "xx sig xx"),
    ]);
    let mut prober = PathProber::new(paths, exec.clone());

    let detected = prober.probe("http://h").await;

    assert_eq!(detected, vec!["http://h/a", "http://h/b", "http://h/c"]);
    assert_eq!(exec.calls(), vec!["http://h/a", "http://h/b", "http://h/c"]);
    assert_eq!(prober.failed_count(), 0);
}

#[tokio::test]
async fn abort_happens_before_the_22nd_attempt() {
    let exec = ScriptedExecutor::failing();
    let mut prober = PathProber::new(numbered_paths(30), exec.clone());

    let detected = prober.probe("http://h").await;

    assert!(detected.is_empty());
    assert_eq!(exec.call_count(), 21);
    assert!(prober.aborted());
}

#[tokio::test]
async fn matches_found_before_abort_are_preserved() {
    let mut pairs = vec![("/hit".to_string(), "token".to_string())];
    pairs.extend((0..30).map(|i| (format!("/miss{i}"), format!("sig{i}"))));
    let paths = PathMap::from_pairs(pairs);
    let exec = ScriptedExecutor::new([("http://h/hit", "the TOKEN is here")]);
    let mut prober = PathProber::new(paths, exec.clone());

    let detected = prober.probe("http://h").await;

    assert_eq!(detected, vec!["http://h/hit"]);
    assert_eq!(exec.call_count(), 22);
}

#[tokio::test]
async fn signature_match_is_case_insensitive() {
    let paths = PathMap::from_pairs([("/token", "found_token")]);
    let exec = ScriptedExecutor::new([("http://h/token", "<b>FOUND_TOKEN</b>")]);
    let mut prober = PathProber::new(paths, exec);

    let detected = prober.probe("http://h").await;

    assert_eq!(detected, vec!["http://h/token"]);
}

#[tokio::test]
async fn clean_miss_is_not_a_failure() {
    let paths = PathMap::from_pairs([("/admin", "AdminPanel")]);
    let exec = ScriptedExecutor::new([("http://x.test/admin", "<html>login</html>")]);
    let mut prober = PathProber::new(paths, exec);

    let detected = prober.probe("http://x.test").await;

    assert!(detected.is_empty());
    assert_eq!(prober.failed_count(), 0);
}

#[tokio::test]
async fn only_matching_paths_are_reported() {
    let paths = PathMap::from_pairs([("/a", "sig1"), ("/b", "sig2")]);
    let exec = ScriptedExecutor::new([
        ("http://h/a", "xxsig1xx"),
        ("http://h/b", "no match here"),
    ]);
    let mut prober = PathProber::new(paths, exec);

    let detected = prober.probe("http://h").await;

    assert_eq!(detected, vec!["http://h/a"]);
}

#[tokio::test]
async fn failure_counter_resets_between_runs() {
    let exec = ScriptedExecutor::failing();
    let mut prober = PathProber::new(numbered_paths(30), exec.clone());

    prober.probe("http://h").await;
    assert_eq!(exec.call_count(), 21);

    prober.probe("http://h").await;
    assert_eq!(exec.call_count(), 42);
    assert_eq!(prober.failed_count(), 21);
}

#[tokio::test]
async fn length_filter_discards_implausible_bodies() {
    let paths = PathMap::from_pairs([("/a", "sig")]);
    let exec = ScriptedExecutor::new([("http://h/a", "sig!")]);
    let mut prober = PathProber::new(paths, exec).with_length_filter(Some(LengthBounds {
        min: 100,
        max: 10000,
    }));

    let detected = prober.probe("http://h").await;

    assert!(detected.is_empty());
    assert_eq!(prober.failed_count(), 0);
}

#[tokio::test]
async fn runner_scans_target_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<title>AdminPanel</title>"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dictionary =
        PathMap::from_pairs([("/admin", "adminpanel"), ("/login", "Sign in")]);
    let options = Options {
        // trailing slash gets trimmed before concatenation
        urls: vec![format!("{}/", server.uri())],
        dictionary: DictionarySource::Inline(dictionary),
        ..Default::default()
    };
    let runner = Runner::new(options).unwrap();

    let report = runner.run().await.unwrap();

    assert_eq!(report.paths_total, 2);
    assert_eq!(report.targets.len(), 1);
    let target = &report.targets[0];
    assert_eq!(target.detected, vec![format!("{}/admin", server.uri())]);
    assert_eq!(target.failed_count, 1);
    assert!(!target.aborted);
}

#[tokio::test]
async fn runner_rejects_missing_targets() {
    assert!(matches!(
        Runner::new(Options::default()),
        Err(ScanError::NoTargets)
    ));
}

#[tokio::test]
async fn runner_rejects_invalid_target_url() {
    let options = Options {
        urls: vec!["not a url".to_string()],
        ..Default::default()
    };
    let runner = Runner::new(options).unwrap();
    assert!(matches!(
        runner.load_targets().await,
        Err(ScanError::InvalidUrl { .. })
    ));
}

#[test]
fn parse_length_bounds_ok() {
    let bounds = crate::utils::parse_length_bounds_range("100-10000").unwrap();
    assert_eq!(bounds.min, 100);
    assert_eq!(bounds.max, 10000);
    assert!(bounds.contains(101));
    assert!(!bounds.contains(100));
    assert!(!bounds.contains(10000));
}

#[test]
fn parse_length_bounds_rejects_invalid() {
    assert!(crate::utils::parse_length_bounds_range("500").is_err());
    assert!(crate::utils::parse_length_bounds_range("500-").is_err());
    assert!(crate::utils::parse_length_bounds_range("-500").is_err());
    assert!(crate::utils::parse_length_bounds_range("500-100").is_err());
}

#[test]
fn output_records_flatten_targets() {
    let targets = vec![
        crate::runner::TargetReport {
            base_url: "http://a".to_string(),
            detected: vec!["http://a/x".to_string(), "http://a/y".to_string()],
            failed_count: 0,
            aborted: false,
        },
        crate::runner::TargetReport {
            base_url: "http://b".to_string(),
            detected: vec![],
            failed_count: 21,
            aborted: true,
        },
    ];
    let records = crate::output::build_records(&targets);
    assert_eq!(records.len(), 2);

    let text = String::from_utf8(crate::output::render_text(&records)).unwrap();
    assert_eq!(text, "http://a/x\nhttp://a/y\n");

    let json = String::from_utf8(crate::output::render_json(&records)).unwrap();
    assert!(json.contains("\"base_url\""));
    assert!(json.contains("http://a/y"));
}

#[test]
fn output_format_inference() {
    use crate::output::{infer_format_from_path, OutputFormat};
    assert_eq!(infer_format_from_path("out.json"), Some(OutputFormat::Json));
    assert_eq!(infer_format_from_path("out.txt"), Some(OutputFormat::Text));
    assert_eq!(infer_format_from_path("out.bin"), None);
    assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
    assert_eq!(OutputFormat::parse("csv"), None);
}

#[test]
fn missing_config_is_tolerated_when_allowed() {
    let path = std::env::temp_dir().join("pathprobe-test-missing-config.yml");
    let cfg = crate::config::load_config(&path, true).unwrap();
    assert!(cfg.urls.is_none());
    assert!(crate::config::load_config(&path, false).is_err());
}

#[test]
fn dictionary_file_roundtrip() {
    let path = std::env::temp_dir().join("pathprobe-test-dictionary.json");
    std::fs::write(&path, r#"{"/admin": "AdminPanel", "/env": "profiles"}"#).unwrap();

    let map = PathMap::load(&path).unwrap();
    let paths: Vec<_> = map.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["/admin", "/env"]);

    std::fs::remove_file(&path).ok();
}
