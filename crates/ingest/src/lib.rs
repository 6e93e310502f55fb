//! Shop Insights ingest library.
//!
//! Keeps a local, multi-tenant copy of each connected store's customers,
//! products and orders. Two paths feed it:
//!
//! - **Full sync** pages through a store's REST Admin API collections
//!   ([`sync::FullSync`]).
//! - **Webhooks** push individual changes as they happen
//!   ([`webhooks::WebhookDispatcher`]).
//!
//! Both converge on the same [`reconcile::Reconciler`], so a record ends up
//! identical no matter which path delivered it, or how many times.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod routes;
pub mod shopify;
pub mod state;
pub mod sync;
pub mod webhooks;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the application router with request tracing.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
