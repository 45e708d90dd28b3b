//! Prometheus metrics of the watch store.
//!
//! Collectors are created lazily and registered into the crate `REGISTRY`
//! the first time `register_custom_metrics` runs. `start_server` exposes them
//! at `/metrics`.

use std::net::SocketAddr;
use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;


lazy_static! {
    /// Ops delivered to subscribers, by op type
    pub static ref WATCH_EVENTS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("dwatch_watch_events", "Ops delivered to watch subscribers"),
        &["op_type"]
    )
    .expect("metric can not be created");

    /// Transient failures inside watch loops, by the stage that failed
    pub static ref WATCH_POLL_ERRORS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("dwatch_watch_poll_errors", "Store errors observed by watch loops"),
        &["stage"]
    )
    .expect("metric can not be created");

    pub static ref ACTIVE_WATCHES_METRIC: IntGauge =
        IntGauge::new("dwatch_active_watches", "Running watch loops")
            .expect("metric can not be created");

    /// Record store operation latency in ms
    pub static ref STORE_OP_DURATION_METRIC: HistogramVec = HistogramVec::new(
        HistogramOpts::new("dwatch_store_op_duration_ms", "Record store operation latency in ms")
            .buckets(exponential_buckets(0.05, 2.0, 16).expect("valid buckets")),
        &["op"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

pub(crate) fn register_custom_metrics(registry: &Registry) {
    let collectors: [Box<dyn prometheus::core::Collector>; 4] = [
        Box::new(WATCH_EVENTS_METRIC.clone()),
        Box::new(WATCH_POLL_ERRORS_METRIC.clone()),
        Box::new(ACTIVE_WATCHES_METRIC.clone()),
        Box::new(STORE_OP_DURATION_METRIC.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            error!(?e, "collector can not be registered");
        }
    }
}

/// Text exposition of every collector in `REGISTRY`.
pub fn gather() -> String {
    use prometheus::Encoder;

    REGISTER.call_once(|| register_custom_metrics(&REGISTRY));

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}

/// Serves `/metrics` on `addr` until `shutdown` is cancelled.
pub async fn start_server(
    addr: SocketAddr,
    shutdown: CancellationToken,
) {
    REGISTER.call_once(|| register_custom_metrics(&REGISTRY));

    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    info!(%addr, "metrics server listening");
    let (_, server) =
        warp::serve(metrics_route).bind_with_graceful_shutdown(addr, async move {
            shutdown.cancelled().await;
        });
    server.await;
    info!("metrics server stopped");
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(gather())
}
