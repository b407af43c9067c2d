//! Random slowdown middleware for exercising clients against a sluggish server.

use axum::body::Body;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use rand::Rng;

const MAX_DELAY_MS: u64 = 2000;

/// Delays every request by a uniformly random 0..2s.
pub async fn slowdown_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let delay_ms = rand::rng().random_range(0..MAX_DELAY_MS);
    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
    next.run(request).await
}
