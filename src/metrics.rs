//! Prometheus metrics for the dataset chat pipeline.
//!
//! Exposes:
//! - `dataset_chat_turn_duration_seconds` (histogram by outcome)
//! - `dataset_chat_turn_total` (counter by outcome)
//! - `dataset_chat_turn_inflight` (gauge)
//! - `dataset_chat_stage_duration_seconds` / `dataset_chat_stage_total` (per stage)
//! - `dataset_chat_batch_size` (relevance and fetch fan-out sizes)
//! - `dataset_chat_api_requests_total` (HTTP API by endpoint and status)
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram_vec, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounterVec, IntGauge, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static TURN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // Exponential buckets from 50ms up to ~3 minutes.
    let buckets =
        prometheus::exponential_buckets(0.05, 2.0, 14).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "dataset_chat_turn_duration_seconds",
        "Conversation turn duration in seconds",
        &["outcome"],
        buckets
    )
    .expect("failed to register turn duration histogram")
});

static TURN_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dataset_chat_turn_total",
        "Total submitted turns by outcome",
        &["outcome"]
    )
    .expect("failed to register turn counter")
});

static TURN_INFLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("dataset_chat_turn_inflight", "Number of turns in progress")
        .expect("failed to register inflight gauge")
});

static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets =
        prometheus::exponential_buckets(0.01, 2.0, 14).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "dataset_chat_stage_duration_seconds",
        "Pipeline stage duration in seconds",
        &["stage"],
        buckets
    )
    .expect("failed to register stage duration histogram")
});

static STAGE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dataset_chat_stage_total",
        "Pipeline stage executions by status",
        &["stage", "status"]
    )
    .expect("failed to register stage counter")
});

static BATCH_SIZE: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dataset_chat_batch_size",
        "Number of concurrent gateway calls per batch",
        &["batch"],
        vec![0.0, 1.0, 2.0, 3.0, 5.0, 10.0]
    )
    .expect("failed to register batch size histogram")
});

static API_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dataset_chat_api_requests_total",
        "HTTP API requests by endpoint and status code",
        &["endpoint", "status"]
    )
    .expect("failed to register api request counter")
});

/// Ensure collectors are registered.
fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&TURN_DURATION);
    Lazy::force(&TURN_TOTAL);
    Lazy::force(&TURN_INFLIGHT);
    Lazy::force(&STAGE_DURATION);
    Lazy::force(&STAGE_TOTAL);
    Lazy::force(&BATCH_SIZE);
    Lazy::force(&API_REQUESTS);
}

fn status_label(success: bool) -> &'static str {
    if success {
        "ok"
    } else {
        "error"
    }
}

/// Increment the inflight gauge when a turn starts running.
pub fn record_turn_start() {
    init_collectors();
    TURN_INFLIGHT.inc();
}

/// Record a finished turn (`answered` or `failed`).
pub fn record_turn_result(outcome: &'static str, duration: Duration) {
    init_collectors();
    TURN_INFLIGHT.dec();
    TURN_DURATION
        .with_label_values(&[outcome])
        .observe(duration.as_secs_f64());
    TURN_TOTAL.with_label_values(&[outcome]).inc();
}

/// Count a submission that never started a turn.
pub fn record_turn_ignored() {
    init_collectors();
    TURN_TOTAL.with_label_values(&["ignored"]).inc();
}

pub fn record_stage(stage: &'static str, duration: Duration, success: bool) {
    init_collectors();
    STAGE_DURATION
        .with_label_values(&[stage])
        .observe(duration.as_secs_f64());
    STAGE_TOTAL
        .with_label_values(&[stage, status_label(success)])
        .inc();
}

pub fn observe_batch(batch: &'static str, size: usize) {
    init_collectors();
    BATCH_SIZE.with_label_values(&[batch]).observe(size as f64);
}

pub fn record_api_request(endpoint: &str, status: StatusCode) {
    init_collectors();
    API_REQUESTS
        .with_label_values(&[endpoint, status.as_str()])
        .inc();
}

fn plain_response(status: StatusCode, content_type: &str, body: Vec<u8>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::from(body));
    *response.status_mut() = status;
    if let Ok(value) = HeaderValue::from_str(content_type) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}

/// Prometheus text exposition of the default registry.
pub(crate) async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    init_collectors();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return Ok(plain_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "text/plain",
            b"encode error".to_vec(),
        ));
    }

    Ok(plain_response(StatusCode::OK, encoder.format_type(), buffer))
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/metrics" => metrics_response().await,
        _ => Ok(plain_response(StatusCode::NOT_FOUND, "text/plain", Vec::new())),
    }
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus metrics endpoint started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service_fn(handle_request);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        if let Err(err) = serve(addr).await {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}
