//! Shopify webhook receiver.
//!
//! The body is taken as raw bytes so the signature is checked against
//! exactly what Shopify signed.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
};
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;
use crate::webhooks::{WebhookRequest, WebhookTopic};

const SHOP_DOMAIN_HEADER: &str = "x-shopify-shop-domain";
const SIGNATURE_HEADER: &str = "x-shopify-hmac-sha256";
const WEBHOOK_ID_HEADER: &str = "x-shopify-webhook-id";

/// Build the webhook router.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/shopify/{resource}/{event}", post(receive))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// POST /webhooks/shopify/{resource}/{event} - Ingest one pushed change.
#[instrument(skip(state, headers, body), fields(resource = %resource, event = %event))]
async fn receive(
    State(state): State<AppState>,
    Path((resource, event)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let topic = WebhookTopic::from_path(&resource, &event)
        .ok_or_else(|| AppError::NotFound(format!("webhook topic {resource}/{event}")))?;

    let request = WebhookRequest {
        topic,
        shop_domain: header(&headers, SHOP_DOMAIN_HEADER),
        signature: header(&headers, SIGNATURE_HEADER),
        webhook_id: header(&headers, WEBHOOK_ID_HEADER),
        body: &body,
    };

    let outcome = state.webhooks().dispatch(request).await?;

    Ok(Json(json!({
        "success": true,
        "tenant_id": outcome.tenant_id,
        "duplicate": outcome.duplicate,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_trims_and_skips_blank() {
        let mut headers = HeaderMap::new();
        headers.insert(SHOP_DOMAIN_HEADER, HeaderValue::from_static(" a.myshopify.com "));
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_static("   "));

        assert_eq!(header(&headers, SHOP_DOMAIN_HEADER), Some("a.myshopify.com"));
        assert_eq!(header(&headers, SIGNATURE_HEADER), None);
        assert_eq!(header(&headers, WEBHOOK_ID_HEADER), None);
    }
}
