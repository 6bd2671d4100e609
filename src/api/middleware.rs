//! Request metrics middleware
//!
//! Records count, latency, in-flight requests and server errors for every
//! request that matched a route. Static file requests are not recorded.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::metrics::{InProgressGuard, Timer};

use super::handlers::AppState;
use super::types::ErrorKind;

pub async fn track_metrics(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(endpoint) = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
    else {
        return next.run(request).await;
    };
    let method = request.method().as_str().to_owned();
    let labels = [method.as_str(), endpoint.as_str()];
    let metrics = &state.metrics;

    metrics.http_requests_total.with_labels(&labels).inc();
    let in_progress =
        InProgressGuard::new(metrics.http_requests_in_progress.with_labels(&labels));

    let timer = Timer::start();
    let response = next.run(request).await;
    timer.record(&metrics.http_request_latency.with_labels(&labels));
    drop(in_progress);

    if response.status().is_server_error() {
        let kind = response
            .extensions()
            .get::<ErrorKind>()
            .map(|kind| kind.0)
            .unwrap_or("InternalServerError");
        metrics
            .http_exceptions_total
            .with_labels(&[method.as_str(), endpoint.as_str(), kind])
            .inc();
    }

    response
}
