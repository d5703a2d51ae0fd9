//! In-memory billing provider for tests of the layers above the domain.
//! Only available with the `mock` feature.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;

use crate::billing::webhook::{decode_event, sign_payload, verify_signature};
use crate::billing::{
    BillingCustomer, BillingError, BillingEvent, BillingGateway, BillingInvoice, BillingPaymentIntent,
    BillingSubscription, PaymentMethodSummary, WebhookEvent,
};
use crate::entities::SubscriptionStatus;

pub const FAKE_WEBHOOK_SECRET: &str = "whsec_fake";

#[derive(Default)]
struct FakeState {
    next_id: u32,
    subscriptions: HashMap<String, BillingSubscription>,
    invoices: HashMap<String, Vec<BillingInvoice>>,
    payment_methods: HashMap<String, Vec<PaymentMethodSummary>>,
}

impl FakeState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_fake{}", prefix, self.next_id)
    }
}

/// Billing gateway keeping customers and subscriptions in memory.
///
/// New subscriptions start in `initial_status` with one open invoice.
pub struct FakeBillingGateway {
    state: RwLock<FakeState>,
    initial_status: SubscriptionStatus,
    configured: bool,
}

impl Default for FakeBillingGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBillingGateway {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(FakeState::default()),
            initial_status: SubscriptionStatus::Active,
            configured: true,
        }
    }

    /// Status given to subscriptions created from now on
    pub fn with_initial_status(mut self, status: SubscriptionStatus) -> Self {
        self.initial_status = status;
        self
    }

    /// Behave as if no API key was set
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, FakeState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, FakeState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn ensure_configured(&self) -> Result<(), BillingError> {
        if self.configured {
            Ok(())
        } else {
            Err(BillingError::Configuration("STRIPE_API_KEY is not set".to_string()))
        }
    }

    fn missing(kind: &str, id: &str) -> BillingError {
        BillingError::Api {
            status: 404,
            error_type: "invalid_request_error".to_string(),
            message: format!("No such {}: '{}'", kind, id),
        }
    }

    /// Change a stored subscription's status, as the provider would on its own
    pub fn set_status(&self, subscription_id: &str, status: SubscriptionStatus) {
        if let Some(subscription) = self.write().subscriptions.get_mut(subscription_id) {
            subscription.status = status;
        }
    }

    /// Signature header for `payload`, valid right now
    pub fn sign(payload: &str) -> String {
        sign_payload(payload, FAKE_WEBHOOK_SECRET, Utc::now().timestamp()).unwrap_or_default()
    }

    /// Body of a `customer.subscription.*` event in the provider's format
    pub fn subscription_event(event_type: &str, subscription_id: &str, customer_id: &str, status: &str) -> String {
        json!({
            "id": "evt_fake",
            "type": event_type,
            "data": {
                "object": {
                    "id": subscription_id,
                    "customer": customer_id,
                    "status": status,
                    "cancel_at_period_end": false,
                }
            }
        })
        .to_string()
    }
}

#[async_trait]
impl BillingGateway for FakeBillingGateway {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn create_customer(&self, email: &str, _name: &str) -> Result<BillingCustomer, BillingError> {
        self.ensure_configured()?;
        let id = self.write().id("cus");
        Ok(BillingCustomer { id, email: Some(email.to_string()) })
    }

    async fn create_subscription(&self, customer_id: &str, price_id: &str) -> Result<BillingSubscription, BillingError> {
        self.ensure_configured()?;
        let mut state = self.write();
        let id = state.id("sub");
        let invoice_id = state.id("in");
        let intent_id = state.id("pi");
        let now = Utc::now();

        let paid = !self.initial_status.is_retrying();
        let invoice = BillingInvoice {
            id: invoice_id,
            subscription_id: Some(id.clone()),
            status: Some(if paid { "paid" } else { "open" }.to_string()),
            amount_due: 4900,
            amount_paid: if paid { 4900 } else { 0 },
            currency: "usd".to_string(),
            created: Some(now),
            next_payment_attempt: None,
            attempt_count: 1,
            hosted_invoice_url: None,
            payment_intent: Some(BillingPaymentIntent {
                client_secret: Some(format!("{}_secret", intent_id)),
                id: intent_id,
                status: Some(if paid { "succeeded" } else { "requires_payment_method" }.to_string()),
                created: Some(now),
            }),
        };

        let subscription = BillingSubscription {
            id: id.clone(),
            customer_id: customer_id.to_string(),
            status: self.initial_status.clone(),
            price_id: Some(price_id.to_string()),
            current_period_end: Some(now + Duration::days(30)),
            cancel_at_period_end: false,
            latest_invoice: Some(invoice.clone()),
        };

        state.invoices.entry(customer_id.to_string()).or_default().push(invoice);
        state.subscriptions.insert(id, subscription.clone());
        Ok(subscription)
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<BillingSubscription, BillingError> {
        self.ensure_configured()?;
        self.read()
            .subscriptions
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| Self::missing("subscription", subscription_id))
    }

    async fn set_cancel_at_period_end(&self, subscription_id: &str, cancel: bool) -> Result<BillingSubscription, BillingError> {
        self.ensure_configured()?;
        let mut state = self.write();
        let subscription = state
            .subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| Self::missing("subscription", subscription_id))?;
        subscription.cancel_at_period_end = cancel;
        Ok(subscription.clone())
    }

    async fn list_invoices(&self, customer_id: &str, limit: u32) -> Result<Vec<BillingInvoice>, BillingError> {
        self.ensure_configured()?;
        let state = self.read();
        let invoices = state.invoices.get(customer_id).cloned().unwrap_or_default();
        Ok(invoices.into_iter().rev().take(limit as usize).collect())
    }

    async fn attach_payment_method(&self, customer_id: &str, payment_method_id: &str) -> Result<PaymentMethodSummary, BillingError> {
        self.ensure_configured()?;
        let method = PaymentMethodSummary {
            id: payment_method_id.to_string(),
            brand: Some("visa".to_string()),
            last4: Some("4242".to_string()),
            exp_month: Some(12),
            exp_year: Some(2030),
        };
        self.write()
            .payment_methods
            .entry(customer_id.to_string())
            .or_default()
            .insert(0, method.clone());
        Ok(method)
    }

    async fn list_payment_methods(&self, customer_id: &str) -> Result<Vec<PaymentMethodSummary>, BillingError> {
        self.ensure_configured()?;
        Ok(self.read().payment_methods.get(customer_id).cloned().unwrap_or_default())
    }

    fn parse_webhook(&self, payload: &str, signature_header: &str) -> Result<WebhookEvent, BillingError> {
        verify_signature(payload, signature_header, FAKE_WEBHOOK_SECRET, Utc::now().timestamp())?;
        let event = decode_event(payload)?;
        if let BillingEvent::SubscriptionUpdated(remote) | BillingEvent::SubscriptionDeleted(remote) = &event.event {
            self.set_status(&remote.id, remote.status.clone());
        }
        Ok(event)
    }
}
