//! Stripe implementation of [`BillingGateway`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::types::{
    BillingCustomer, BillingInvoice, BillingPaymentIntent, BillingSubscription, PaymentMethodSummary,
    WebhookEvent,
};
use super::{webhook, BillingError, BillingGateway};

/// Stripe REST client
#[derive(Debug, Clone)]
pub struct StripeClient {
    http: Client,
    api_key: Option<String>,
    webhook_secret: Option<String>,
    base_url: String,
}

impl StripeClient {
    /// Stripe API base URL
    pub const BASE_URL: &'static str = "https://api.stripe.com/v1";

    const SUBSCRIPTION_EXPAND: &'static str = "latest_invoice.payment_intent";

    /// Create a client. Either secret may be absent; calls needing it fail
    /// with a configuration error.
    pub fn new(api_key: Option<String>, webhook_secret: Option<String>) -> Result<Self, BillingError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            webhook_secret: webhook_secret.filter(|s| !s.trim().is_empty()),
            base_url: Self::BASE_URL.to_string(),
        })
    }

    /// Point the client at another server, e.g. a local stripe-mock
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_key(&self) -> Result<&str, BillingError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| BillingError::Configuration("STRIPE_API_KEY is not set".to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, BillingError> {
        debug!("Stripe GET {}", path);
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .basic_auth(self.api_key()?, Option::<&str>::None)
            .query(query)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, form: &[(&str, String)]) -> Result<T, BillingError> {
        debug!("Stripe POST {}", path);
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(self.api_key()?, Option::<&str>::None)
            .form(form)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BillingError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body: Result<StripeErrorBody, _> = response.json().await;
        let error = match body {
            Ok(body) => BillingError::Api {
                status: status.as_u16(),
                error_type: body.error.error_type,
                message: body.error.message,
            },
            Err(_) => BillingError::Api {
                status: status.as_u16(),
                error_type: "unknown".to_string(),
                message: format!("HTTP {}", status),
            },
        };
        warn!("Stripe request failed: {}", error);
        Err(error)
    }
}

#[async_trait]
impl BillingGateway for StripeClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn create_customer(&self, email: &str, name: &str) -> Result<BillingCustomer, BillingError> {
        let customer: StripeCustomer = self
            .post("/customers", &[("email", email.to_string()), ("name", name.to_string())])
            .await?;
        Ok(BillingCustomer { id: customer.id, email: customer.email })
    }

    async fn create_subscription(&self, customer_id: &str, price_id: &str) -> Result<BillingSubscription, BillingError> {
        let subscription: StripeSubscription = self
            .post(
                "/subscriptions",
                &[
                    ("customer", customer_id.to_string()),
                    ("items[0][price]", price_id.to_string()),
                    ("payment_behavior", "default_incomplete".to_string()),
                    ("expand[]", Self::SUBSCRIPTION_EXPAND.to_string()),
                ],
            )
            .await?;
        Ok(subscription.into())
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<BillingSubscription, BillingError> {
        let subscription: StripeSubscription = self
            .get(
                &format!("/subscriptions/{}", subscription_id),
                &[("expand[]", Self::SUBSCRIPTION_EXPAND.to_string())],
            )
            .await?;
        Ok(subscription.into())
    }

    async fn set_cancel_at_period_end(&self, subscription_id: &str, cancel: bool) -> Result<BillingSubscription, BillingError> {
        let subscription: StripeSubscription = self
            .post(
                &format!("/subscriptions/{}", subscription_id),
                &[
                    ("cancel_at_period_end", cancel.to_string()),
                    ("expand[]", Self::SUBSCRIPTION_EXPAND.to_string()),
                ],
            )
            .await?;
        Ok(subscription.into())
    }

    async fn list_invoices(&self, customer_id: &str, limit: u32) -> Result<Vec<BillingInvoice>, BillingError> {
        let list: StripeList<StripeInvoice> = self
            .get(
                "/invoices",
                &[("customer", customer_id.to_string()), ("limit", limit.clamp(1, 100).to_string())],
            )
            .await?;
        Ok(list.data.into_iter().map(BillingInvoice::from).collect())
    }

    async fn attach_payment_method(&self, customer_id: &str, payment_method_id: &str) -> Result<PaymentMethodSummary, BillingError> {
        let method: StripePaymentMethod = self
            .post(
                &format!("/payment_methods/{}/attach", payment_method_id),
                &[("customer", customer_id.to_string())],
            )
            .await?;

        let _: StripeCustomer = self
            .post(
                &format!("/customers/{}", customer_id),
                &[("invoice_settings[default_payment_method]", payment_method_id.to_string())],
            )
            .await?;

        Ok(method.into())
    }

    async fn list_payment_methods(&self, customer_id: &str) -> Result<Vec<PaymentMethodSummary>, BillingError> {
        let list: StripeList<StripePaymentMethod> = self
            .get(
                "/payment_methods",
                &[("customer", customer_id.to_string()), ("type", "card".to_string())],
            )
            .await?;
        Ok(list.data.into_iter().map(PaymentMethodSummary::from).collect())
    }

    fn parse_webhook(&self, payload: &str, signature_header: &str) -> Result<WebhookEvent, BillingError> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or_else(|| BillingError::Configuration("STRIPE_WEBHOOK_SECRET is not set".to_string()))?;
        webhook::verify_signature(payload, signature_header, secret, Utc::now().timestamp())?;
        webhook::decode_event(payload)
    }
}

// Wire types. Only the fields the application reads are declared.

#[derive(Debug, Deserialize)]
pub(crate) struct StripeList<T> {
    pub data: Vec<T>,
}

/// A field Stripe returns either as an id or, when expanded, as an object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Expandable<T> {
    Id(String),
    Object(Box<T>),
}

impl<T> Expandable<T> {
    fn into_object(self) -> Option<T> {
        match self {
            Expandable::Id(_) => None,
            Expandable::Object(object) => Some(*object),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeObjectRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripePrice {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeSubscriptionItem {
    pub price: StripePrice,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeSubscription {
    pub id: String,
    pub customer: Expandable<StripeObjectRef>,
    pub status: String,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub items: Option<StripeList<StripeSubscriptionItem>>,
    #[serde(default)]
    pub latest_invoice: Option<Expandable<StripeInvoice>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripePaymentIntent {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeInvoice {
    pub id: String,
    #[serde(default)]
    pub subscription: Option<Expandable<StripeObjectRef>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount_due: i64,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub next_payment_attempt: Option<i64>,
    #[serde(default)]
    pub attempt_count: u32,
    #[serde(default)]
    pub hosted_invoice_url: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<Expandable<StripePaymentIntent>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeCard {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
    #[serde(default)]
    pub exp_month: Option<u32>,
    #[serde(default)]
    pub exp_year: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripePaymentMethod {
    pub id: String,
    #[serde(default)]
    pub card: Option<StripeCard>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(rename = "type", default)]
    error_type: String,
    #[serde(default)]
    message: String,
}

fn timestamp(seconds: Option<i64>) -> Option<DateTime<Utc>> {
    seconds.and_then(|s| Utc.timestamp_opt(s, 0).single())
}

fn reference_id(reference: Expandable<StripeObjectRef>) -> String {
    match reference {
        Expandable::Id(id) => id,
        Expandable::Object(object) => object.id,
    }
}

impl From<StripePaymentIntent> for BillingPaymentIntent {
    fn from(intent: StripePaymentIntent) -> Self {
        BillingPaymentIntent {
            id: intent.id,
            status: intent.status,
            created: timestamp(intent.created),
            client_secret: intent.client_secret,
        }
    }
}

impl From<StripeInvoice> for BillingInvoice {
    fn from(invoice: StripeInvoice) -> Self {
        BillingInvoice {
            id: invoice.id,
            subscription_id: invoice.subscription.map(reference_id),
            status: invoice.status,
            amount_due: invoice.amount_due,
            amount_paid: invoice.amount_paid,
            currency: invoice.currency,
            created: timestamp(invoice.created),
            next_payment_attempt: timestamp(invoice.next_payment_attempt),
            attempt_count: invoice.attempt_count,
            hosted_invoice_url: invoice.hosted_invoice_url,
            payment_intent: invoice
                .payment_intent
                .and_then(Expandable::into_object)
                .map(BillingPaymentIntent::from),
        }
    }
}

impl From<StripeSubscription> for BillingSubscription {
    fn from(subscription: StripeSubscription) -> Self {
        let first_item = subscription.items.and_then(|items| items.data.into_iter().next());
        let item_period_end = first_item.as_ref().and_then(|item| item.current_period_end);

        BillingSubscription {
            id: subscription.id,
            customer_id: reference_id(subscription.customer),
            status: subscription.status.into(),
            price_id: first_item.map(|item| item.price.id),
            current_period_end: timestamp(subscription.current_period_end.or(item_period_end)),
            cancel_at_period_end: subscription.cancel_at_period_end,
            latest_invoice: subscription
                .latest_invoice
                .and_then(Expandable::into_object)
                .map(BillingInvoice::from),
        }
    }
}

impl From<StripePaymentMethod> for PaymentMethodSummary {
    fn from(method: StripePaymentMethod) -> Self {
        let card = method.card;
        PaymentMethodSummary {
            id: method.id,
            brand: card.as_ref().and_then(|c| c.brand.clone()),
            last4: card.as_ref().and_then(|c| c.last4.clone()),
            exp_month: card.as_ref().and_then(|c| c.exp_month),
            exp_year: card.as_ref().and_then(|c| c.exp_year),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SubscriptionStatus;

    #[test]
    fn test_subscription_with_expanded_invoice() {
        let json = r#"{
            "id": "sub_123",
            "object": "subscription",
            "customer": "cus_123",
            "status": "past_due",
            "current_period_end": 1709856000,
            "cancel_at_period_end": false,
            "items": {"object": "list", "data": [{"price": {"id": "price_abc"}}]},
            "latest_invoice": {
                "id": "in_1",
                "subscription": "sub_123",
                "status": "open",
                "amount_due": 4900,
                "currency": "usd",
                "created": 1709251200,
                "next_payment_attempt": null,
                "attempt_count": 2,
                "payment_intent": {"id": "pi_1", "status": "requires_payment_method", "created": 1709251205}
            }
        }"#;

        let subscription: BillingSubscription = serde_json::from_str::<StripeSubscription>(json).unwrap().into();
        assert_eq!(subscription.customer_id, "cus_123");
        assert_eq!(subscription.status, SubscriptionStatus::PastDue);
        assert_eq!(subscription.price_id.as_deref(), Some("price_abc"));
        assert!(subscription.current_period_end.is_some());

        let invoice = subscription.latest_invoice.unwrap();
        assert_eq!(invoice.attempt_count, 2);
        assert_eq!(invoice.subscription_id.as_deref(), Some("sub_123"));
        assert!(invoice.next_payment_attempt.is_none());
        assert_eq!(invoice.payment_intent.unwrap().id, "pi_1");
    }

    #[test]
    fn test_unexpanded_invoice_is_dropped() {
        let json = r#"{"id": "sub_1", "customer": {"id": "cus_9"}, "status": "active", "latest_invoice": "in_1"}"#;
        let subscription: BillingSubscription = serde_json::from_str::<StripeSubscription>(json).unwrap().into();
        assert_eq!(subscription.customer_id, "cus_9");
        assert!(subscription.latest_invoice.is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_fast() {
        let client = StripeClient::new(None, None).unwrap();
        assert!(!client.is_configured());
        let result = client.create_customer("a@example.com", "A").await;
        assert!(matches!(result, Err(BillingError::Configuration(_))));
        assert!(matches!(client.parse_webhook("{}", "t=1,v1=00"), Err(BillingError::Configuration(_))));
    }
}
