use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubscribeRequest {
    /// Billing price id; the server default is used when omitted
    pub price_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct PaymentMethodRequest {
    /// Payment method created in the browser, e.g. `pm_...`
    #[validate(length(min = 1, message = "A payment method id is required"))]
    pub payment_method_id: String,
}

/// Acknowledgement returned to the billing provider
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookResponse {
    pub received: bool,
    pub event: String,
    /// Whether a local subscription changed
    pub handled: bool,
}
