// Copyright (c) 2026 QueryGate Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP surface. Input validation happens here, before the pipeline
//! starts: a missing or empty query never reaches the filter.

use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::pipeline::{QueryOutcome, QueryPipeline};
use crate::telemetry::Telemetry;

pub struct AppState {
    pub pipeline: QueryPipeline,
    pub telemetry: Telemetry,
}

pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/api/query", post(handle_query))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(
    listener: tokio::net::TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn index() -> impl IntoResponse {
    "querygate: POST /api/query with a JSON body containing a query field\n"
}

async fn healthz() -> impl IntoResponse {
    "ok\n"
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.telemetry.render()
}

async fn handle_query(
    State(state): State<Arc<AppState>>,
    body: Option<Json<Value>>,
) -> impl IntoResponse {
    let query = body
        .as_ref()
        .and_then(|Json(v)| v.get("query"))
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    if query.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "query is required" })),
        );
    }

    tracing::info!(target: "querygate.server", "received query");
    let outcome = state.pipeline.process(&query).await;
    let body = match outcome {
        QueryOutcome::Blocked { message } => json!({
            "status": "blocked",
            "message": message,
        }),
        QueryOutcome::Error { message } => json!({
            "status": "error",
            "message": message,
        }),
        QueryOutcome::Approved {
            message,
            response_hash,
            archive_ref,
        } => {
            let mut metadata = json!({ "responseHash": response_hash });
            if let (Some(ref_value), Some(map)) = (archive_ref, metadata.as_object_mut()) {
                map.insert("archiveRef".to_string(), Value::String(ref_value));
            }
            json!({
                "status": "approved",
                "message": message,
                "metadata": metadata,
            })
        }
    };
    (StatusCode::OK, Json(body))
}
