//! Billing provider integration.
//!
//! The application talks to the hosted billing provider only through the
//! [`BillingGateway`] trait. [`stripe::StripeClient`] is the production
//! implementation; tests use mocks or the fake in `testing`.

use async_trait::async_trait;
use thiserror::Error;

pub mod retry;
pub mod stripe;
pub mod types;
pub mod webhook;

pub use types::{
    BillingCustomer, BillingEvent, BillingInvoice, BillingPaymentIntent, BillingSubscription,
    PaymentMethodSummary, WebhookEvent,
};

/// Errors from the billing provider
#[derive(Debug, Error)]
pub enum BillingError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the request
    #[error("Billing API error ({status}): {message}")]
    Api {
        status: u16,
        error_type: String,
        message: String,
    },

    /// Response or event body could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Webhook signature missing, stale or wrong
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// Billing is not configured
    #[error("Billing configuration error: {0}")]
    Configuration(String),
}

/// Operations the application needs from the billing provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BillingGateway: Send + Sync {
    /// Whether credentials are present
    fn is_configured(&self) -> bool;

    async fn create_customer(&self, email: &str, name: &str) -> Result<BillingCustomer, BillingError>;

    /// Start a subscription; the first invoice is left open until paid
    async fn create_subscription(&self, customer_id: &str, price_id: &str) -> Result<BillingSubscription, BillingError>;

    /// Fetch a subscription with its latest invoice and payment intent
    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<BillingSubscription, BillingError>;

    /// Toggle cancellation at the end of the current period
    async fn set_cancel_at_period_end(&self, subscription_id: &str, cancel: bool) -> Result<BillingSubscription, BillingError>;

    async fn list_invoices(&self, customer_id: &str, limit: u32) -> Result<Vec<BillingInvoice>, BillingError>;

    /// Attach a payment method and make it the customer's default
    async fn attach_payment_method(&self, customer_id: &str, payment_method_id: &str) -> Result<PaymentMethodSummary, BillingError>;

    /// Cards saved for the customer
    async fn list_payment_methods(&self, customer_id: &str) -> Result<Vec<PaymentMethodSummary>, BillingError>;

    /// Verify a webhook signature header and decode the event
    fn parse_webhook(&self, payload: &str, signature_header: &str) -> Result<WebhookEvent, BillingError>;
}
