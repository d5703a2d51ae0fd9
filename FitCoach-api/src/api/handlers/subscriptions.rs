use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use tracing::{info, instrument};

use fit_coach_domain::auth::AuthUser;
use fit_coach_domain::billing::{BillingInvoice, PaymentMethodSummary};
use fit_coach_domain::entities::{Subscription, SubscriptionOverview};

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::handlers::validate_request;
use crate::api::state::SubscriptionService;
use crate::entities::subscriptions::{PaymentMethodRequest, SubscribeRequest};

/// Subscription with the next payment retry estimate when payments fail
#[utoipa::path(
    get,
    path = "/api/v1/clients/{client_id}/subscription",
    params(("client_id" = String, Path, description = "Client user ID")),
    responses(
        (status = 200, description = "Subscription found", body = SubscriptionOverview),
        (status = 404, description = "No subscription", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "subscriptions"
)]
#[instrument(skip(service, user))]
pub async fn get_subscription(
    State(service): State<SubscriptionService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
) -> ApiResult<Json<SubscriptionOverview>> {
    Ok(Json(service.get_subscription(&user, &client_id).await?))
}

/// Subscribe the client. The response carries a client secret when the
/// first payment still needs confirming.
#[utoipa::path(
    post,
    path = "/api/v1/clients/{client_id}/subscription",
    params(("client_id" = String, Path, description = "Client user ID")),
    request_body = SubscribeRequest,
    responses(
        (status = 201, description = "Subscription created", body = SubscriptionOverview),
        (status = 403, description = "Only the client's coach", body = ErrorResponse),
        (status = 409, description = "Client already subscribed", body = ErrorResponse),
        (status = 402, description = "Card declined", body = ErrorResponse),
        (status = 502, description = "Billing provider error", body = ErrorResponse),
        (status = 503, description = "Billing not configured", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "subscriptions"
)]
#[instrument(skip(service, user, request))]
pub async fn subscribe(
    State(service): State<SubscriptionService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
    request: Option<Json<SubscribeRequest>>,
) -> ApiResult<impl IntoResponse> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    validate_request(&request)?;
    let overview = service.subscribe(&user, &client_id, request.price_id).await?;
    info!("Client {} subscription is {}", client_id, overview.subscription.status);
    Ok((StatusCode::CREATED, Json(overview)))
}

/// Cancel at the end of the current period
#[utoipa::path(
    post,
    path = "/api/v1/clients/{client_id}/subscription/cancel",
    params(("client_id" = String, Path, description = "Client user ID")),
    responses(
        (status = 200, description = "Cancellation scheduled", body = Subscription),
        (status = 404, description = "No subscription", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "subscriptions"
)]
#[instrument(skip(service, user))]
pub async fn cancel_subscription(
    State(service): State<SubscriptionService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
) -> ApiResult<Json<Subscription>> {
    Ok(Json(service.cancel(&user, &client_id).await?))
}

/// Undo a scheduled cancellation
#[utoipa::path(
    post,
    path = "/api/v1/clients/{client_id}/subscription/resume",
    params(("client_id" = String, Path, description = "Client user ID")),
    responses(
        (status = 200, description = "Subscription resumed", body = Subscription),
        (status = 400, description = "Subscription already ended", body = ErrorResponse),
        (status = 404, description = "No subscription", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "subscriptions"
)]
#[instrument(skip(service, user))]
pub async fn resume_subscription(
    State(service): State<SubscriptionService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
) -> ApiResult<Json<Subscription>> {
    Ok(Json(service.resume(&user, &client_id).await?))
}

/// Reload the subscription from the billing provider
#[utoipa::path(
    post,
    path = "/api/v1/clients/{client_id}/subscription/refresh",
    params(("client_id" = String, Path, description = "Client user ID")),
    responses(
        (status = 200, description = "Subscription refreshed", body = SubscriptionOverview),
        (status = 404, description = "No subscription", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "subscriptions"
)]
#[instrument(skip(service, user))]
pub async fn refresh_subscription(
    State(service): State<SubscriptionService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
) -> ApiResult<Json<SubscriptionOverview>> {
    Ok(Json(service.refresh(&user, &client_id).await?))
}

/// Attach a payment method and make it the default
#[utoipa::path(
    put,
    path = "/api/v1/clients/{client_id}/subscription/payment-method",
    params(("client_id" = String, Path, description = "Client user ID")),
    request_body = PaymentMethodRequest,
    responses(
        (status = 200, description = "Payment method updated", body = PaymentMethodSummary),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 402, description = "Card declined", body = ErrorResponse),
        (status = 502, description = "Billing provider error", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "subscriptions"
)]
#[instrument(skip(service, user, request))]
pub async fn update_payment_method(
    State(service): State<SubscriptionService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
    Json(request): Json<PaymentMethodRequest>,
) -> ApiResult<Json<PaymentMethodSummary>> {
    validate_request(&request)?;
    Ok(Json(
        service
            .update_payment_method(&user, &client_id, &request.payment_method_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/{client_id}/subscription/payment-methods",
    params(("client_id" = String, Path, description = "Client user ID")),
    responses(
        (status = 200, description = "Saved cards, the default first", body = [PaymentMethodSummary]),
        (status = 404, description = "No subscription", body = ErrorResponse),
        (status = 503, description = "Billing not configured", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "subscriptions"
)]
#[instrument(skip(service, user))]
pub async fn list_payment_methods(
    State(service): State<SubscriptionService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
) -> ApiResult<Json<Vec<PaymentMethodSummary>>> {
    Ok(Json(service.list_payment_methods(&user, &client_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/{client_id}/subscription/invoices",
    params(("client_id" = String, Path, description = "Client user ID")),
    responses(
        (status = 200, description = "Recent invoices, newest first", body = [BillingInvoice]),
        (status = 404, description = "No subscription", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "subscriptions"
)]
#[instrument(skip(service, user))]
pub async fn list_invoices(
    State(service): State<SubscriptionService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
) -> ApiResult<Json<Vec<BillingInvoice>>> {
    Ok(Json(service.list_invoices(&user, &client_id).await?))
}
