use std::io;
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use frdash::{
    dashboard_router, log_app_bind, log_app_start, log_backend_selected, BackendEndpoints,
    CandleChartRefresher, DashboardApp, FetchError, HeadlessPage, JsonFetcher, LoggingConfig,
    PipelineController, SelectionEvent,
};
use serde_json::Value;
use tower::util::ServiceExt;
use tracing::dispatcher::with_default;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Default)]
struct SharedWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
    fn output_string(&self) -> String {
        let bytes = self
            .inner
            .lock()
            .expect("writer lock should not be poisoned");
        String::from_utf8_lossy(&bytes).to_string()
    }
}

struct SharedWriterGuard {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl<'a> MakeWriter<'a> for SharedWriter {
    type Writer = SharedWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedWriterGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for SharedWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = self
            .inner
            .lock()
            .expect("writer lock should not be poisoned");
        out.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_logs(max_level: Level, f: impl FnOnce()) -> String {
    let writer = SharedWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_max_level(max_level)
        .with_writer(writer.clone())
        .finish();
    let dispatch = tracing::Dispatch::new(subscriber);

    with_default(&dispatch, f);
    writer.output_string()
}

struct Unreachable;

impl JsonFetcher for Unreachable {
    fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        Err(FetchError::Network {
            url: url.to_string(),
            message: "connection refused".to_string(),
        })
    }
}

#[test]
fn pipeline_failure_logs_error_event() {
    let logs = capture_logs(Level::INFO, || {
        let page = Arc::new(HeadlessPage::with_standard_containers());
        let controller = PipelineController::new(
            Arc::new(Unreachable),
            page.clone(),
            page.clone(),
            BackendEndpoints::default(),
        );
        controller.run("2024-01-02");
    });

    assert!(logs.contains("\"event\":\"pipeline.run.error\""));
    assert!(logs.contains("\"event\":\"page.notify\""));
    assert_eq!(logs.matches("\"event\":\"pipeline.run.error\"").count(), 1);
}

#[test]
fn missing_ticker_logs_warning_only() {
    let logs = capture_logs(Level::INFO, || {
        let page = Arc::new(HeadlessPage::with_standard_containers());
        let refresher = CandleChartRefresher::new(
            Arc::new(Unreachable),
            page.clone(),
            page.clone(),
            BackendEndpoints::default(),
        );
        refresher.handle_selection(&SelectionEvent::new(vec![(
            "price".to_string(),
            "1".to_string(),
        )]));
    });

    assert!(logs.contains("\"event\":\"candle.ticker_missing\""));
    assert!(logs.contains("\"level\":\"WARN\""));
    assert!(!logs.contains("\"event\":\"page.notify\""));
}

#[test]
fn candle_fetch_failure_logs_error_with_kind() {
    let logs = capture_logs(Level::INFO, || {
        let page = Arc::new(HeadlessPage::with_standard_containers());
        let refresher = CandleChartRefresher::new(
            Arc::new(Unreachable),
            page.clone(),
            page.clone(),
            BackendEndpoints::default(),
        );
        refresher.refresh("VALE3");
    });

    assert!(logs.contains("\"event\":\"candle.fetch.error\""));
    assert!(logs.contains("\"kind\":\"network\""));
}

#[test]
fn server_lifecycle_helpers_emit_baseline_events() {
    let logs = capture_logs(Level::INFO, || {
        let cfg = LoggingConfig::default();
        log_app_start(&cfg);
        log_backend_selected("http://127.0.0.1:8000/", Some("2024-01-02"));
        log_app_bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080));
    });

    assert!(logs.contains("\"event\":\"app.start\""));
    assert!(logs.contains("\"event\":\"backend.selected\""));
    assert!(logs.contains("\"event\":\"app.bind\""));
}

#[test]
fn default_filter_keeps_dashboard_events_and_quiets_dependencies() {
    let writer = SharedWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_env_filter(EnvFilter::new(LoggingConfig::default().filter))
        .with_writer(writer.clone())
        .finish();
    let dispatch = tracing::Dispatch::new(subscriber);

    with_default(&dispatch, || {
        tracing::info!(target: "hyper::client", event = "dependency.chatter");
        tracing::warn!(target: "hyper::client", event = "dependency.warning");
        log_app_bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080));
    });
    let logs = writer.output_string();

    assert!(logs.contains("\"event\":\"app.bind\""));
    assert!(logs.contains("\"event\":\"dependency.warning\""));
    assert!(!logs.contains("dependency.chatter"));
}

#[test]
fn state_route_emits_http_state_event() {
    let logs = capture_logs(Level::INFO, || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("single-thread runtime should build");

        rt.block_on(async {
            let app = DashboardApp::new(Arc::new(Unreachable), BackendEndpoints::default());

            let response = dashboard_router(app)
                .oneshot(
                    Request::builder()
                        .uri("/dashboard/state")
                        .body(Body::empty())
                        .expect("request should build"),
                )
                .await
                .expect("state request should succeed");

            assert_eq!(response.status(), StatusCode::OK);
        });
    });

    assert!(logs.contains("\"event\":\"http.state.request\""));
}
