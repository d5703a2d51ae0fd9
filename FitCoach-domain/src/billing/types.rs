//! Provider-neutral billing records returned by a [`BillingGateway`](super::BillingGateway).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use crate::entities::SubscriptionStatus;
use super::retry::RetryInputs;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingCustomer {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingPaymentIntent {
    pub id: String,
    pub status: Option<String>,
    pub created: Option<DateTime<Utc>>,
    /// Present when the intent needs customer action (3-D Secure, first payment)
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct BillingInvoice {
    pub id: String,
    pub subscription_id: Option<String>,
    pub status: Option<String>,
    pub amount_due: i64,
    pub amount_paid: i64,
    pub currency: String,
    pub created: Option<DateTime<Utc>>,
    pub next_payment_attempt: Option<DateTime<Utc>>,
    pub attempt_count: u32,
    pub hosted_invoice_url: Option<String>,
    #[serde(skip)]
    pub payment_intent: Option<BillingPaymentIntent>,
}

impl BillingInvoice {
    pub fn retry_inputs(&self) -> RetryInputs {
        RetryInputs {
            invoice_created: self.created,
            next_payment_attempt: self.next_payment_attempt,
            attempt_count: self.attempt_count,
            payment_intent_created: self.payment_intent.as_ref().and_then(|pi| pi.created),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingSubscription {
    pub id: String,
    pub customer_id: String,
    pub status: SubscriptionStatus,
    pub price_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub latest_invoice: Option<BillingInvoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct PaymentMethodSummary {
    pub id: String,
    pub brand: Option<String>,
    pub last4: Option<String>,
    pub exp_month: Option<u32>,
    pub exp_year: Option<u32>,
}

/// What a verified webhook event means to the application
#[derive(Debug, Clone, PartialEq)]
pub enum BillingEvent {
    /// `customer.subscription.created` or `customer.subscription.updated`
    SubscriptionUpdated(BillingSubscription),
    /// `customer.subscription.deleted`
    SubscriptionDeleted(BillingSubscription),
    /// `invoice.payment_failed`
    PaymentFailed(BillingInvoice),
    /// `invoice.payment_succeeded` or `invoice.paid`
    PaymentSucceeded(BillingInvoice),
    /// Any other event type, acknowledged without action
    Ignored,
}

/// A verified webhook delivery
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    /// Event type exactly as the provider sent it
    pub event_type: String,
    pub event: BillingEvent,
}

impl WebhookEvent {
    pub fn new(event_type: impl Into<String>, event: BillingEvent) -> Self {
        Self { event_type: event_type.into(), event }
    }
}
