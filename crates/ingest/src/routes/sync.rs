//! Operator-triggered full sync.
//!
//! Disabled unless `INGEST_OPERATOR_TOKEN` is set. Runs inline and returns
//! the per-resource summaries; a sync that aborts part-way answers with the
//! progress made and the cursor to resume from.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::post,
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use shop_insights_core::{ResourceType, TenantId};

use crate::error::AppError;
use crate::shopify::Cursor;
use crate::state::AppState;
use crate::sync::SyncError;
use crate::webhooks::signature::constant_time_compare;

/// Build the operator sync router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/tenants/{tenant_id}/sync/{resource}", post(trigger))
}

#[derive(Debug, Deserialize)]
struct SyncParams {
    resume_from: Option<String>,
}

/// Check the bearer token against the configured operator token.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = state.config().operator_token.as_ref() else {
        return Err(AppError::NotFound("sync API is disabled".to_string()));
    };
    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
    if !constant_time_compare(provided.trim(), expected.expose_secret()) {
        return Err(AppError::Unauthorized("invalid bearer token".to_string()));
    }
    Ok(())
}

/// POST /api/tenants/{tenant_id}/sync/{resource} - Run a full sync.
#[instrument(skip(state, headers, params), fields(tenant_id = %tenant_id, resource = %resource))]
async fn trigger(
    State(state): State<AppState>,
    Path((tenant_id, resource)): Path<(TenantId, String)>,
    Query(params): Query<SyncParams>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    authorize(&state, &headers)?;

    let result = if resource.eq_ignore_ascii_case("all") {
        if params.resume_from.is_some() {
            return Err(AppError::BadRequest(
                "resume_from needs a single resource".to_string(),
            ));
        }
        state.sync().run_all(tenant_id).await
    } else {
        let resource = resource
            .parse::<ResourceType>()
            .map_err(|e| AppError::NotFound(e.to_string()))?;
        let resume_from = params.resume_from.filter(|c| !c.is_empty()).map(Cursor::new);
        state
            .sync()
            .run(tenant_id, resource, resume_from)
            .await
            .map(|summary| vec![summary])
    };

    match result {
        Ok(summaries) => Ok(Json(json!({ "success": true, "summaries": summaries })).into_response()),
        Err(err) => Ok(aborted(err)),
    }
}

/// Respond to a failed sync, carrying the resume point when one exists.
fn aborted(err: SyncError) -> Response {
    if !matches!(
        err,
        SyncError::Authentication { .. } | SyncError::ExternalService { .. }
    ) {
        return AppError::from(err).into_response();
    }
    let progress = err.progress();
    let event_id = sentry::capture_error(&err);
    tracing::error!(
        error = %err,
        sentry_event_id = %event_id,
        reconciled = ?progress.map(|p| p.reconciled),
        resume_from = ?err.resume_from(),
        "Full sync aborted"
    );
    let body = json!({
        "success": false,
        "error": "External service error",
        "progress": progress,
        "resume_from": err.resume_from(),
    });
    (StatusCode::BAD_GATEWAY, Json(body)).into_response()
}
