use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::aggregator::FeedAggregator;
use crate::cache::ResponseCache;
use crate::classify::Event;
use crate::config::feed::FeedConfig;
use crate::ingest::types::SourceConfig;

pub const CACHE_HEADER: &str = "X-Feed-Cache";

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<FeedAggregator>,
    pub cache: Arc<ResponseCache>,
    /// Set once the Prometheus recorder is installed; `/metrics` is 404 until then.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(aggregator: FeedAggregator, cache: ResponseCache) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            cache: Arc::new(cache),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn from_config(cfg: &FeedConfig) -> Self {
        Self::new(
            FeedAggregator::from_config(cfg),
            ResponseCache::from_config(cfg),
        )
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { "OK" }))
        .route("/metrics", get(metrics_text))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct IndexQuery {
    action: Option<String>,
}

/// Body of `GET /?action=feed`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeedResponse {
    #[serde(default)]
    pub items: Vec<Event>,
}

#[derive(Serialize)]
struct SourcesResponse<'a> {
    sources: &'a [SourceConfig],
    cache_ttl_secs: u64,
}

async fn index(State(state): State<AppState>, Query(q): Query<IndexQuery>) -> Response {
    if q.action.as_deref() == Some("feed") {
        return feed(state).await;
    }
    Json(SourcesResponse {
        sources: state.aggregator.sources(),
        cache_ttl_secs: state.cache.ttl().as_secs(),
    })
    .into_response()
}

async fn feed(state: AppState) -> Response {
    let (items, status) = state.cache.get_or_refresh(&state.aggregator).await;
    tracing::debug!(target: "cache", status = status.as_header(), items = items.len(), "feed served");

    let mut resp = Json(FeedResponse { items }).into_response();
    resp.headers_mut()
        .insert(CACHE_HEADER, HeaderValue::from_static(status.as_header()));
    resp.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );
    resp
}

async fn metrics_text(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
