use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use tracing::{info, instrument, warn};

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::state::SubscriptionService;
use crate::entities::subscriptions::WebhookResponse;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Billing provider events. The raw body is needed to verify the signature.
#[utoipa::path(
    post,
    path = "/webhooks/stripe",
    request_body(content = String, description = "Raw event payload", content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "Event signature")),
    responses(
        (status = 200, description = "Event received", body = WebhookResponse),
        (status = 400, description = "Missing or invalid signature", body = ErrorResponse),
        (status = 503, description = "Webhooks not configured", body = ErrorResponse),
    ),
    tag = "subscriptions"
)]
#[instrument(skip(service, headers, payload))]
pub async fn stripe_webhook(
    State(service): State<SubscriptionService>,
    headers: HeaderMap,
    payload: String,
) -> ApiResult<Json<WebhookResponse>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("Webhook received without a signature header");
            ErrorResponse::bad_request("Missing Stripe-Signature header")
        })?;

    let outcome = service.handle_webhook(&payload, signature).await?;
    info!("Webhook {} received (handled: {})", outcome.event, outcome.handled);

    Ok(Json(WebhookResponse {
        received: true,
        event: outcome.event,
        handled: outcome.handled,
    }))
}
