//! Client subscriptions, mirrored locally from the billing provider.
//!
//! The provider is the source of truth. Local rows are written when a client
//! subscribes, whenever a caller refreshes or changes the subscription, and
//! when a webhook event reports a change.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use fit_coach_data::database::DbPool;
use fit_coach_data::models::subscription::{SubscriptionStatusUpdate, SubscriptionUpsert};
use fit_coach_data::repository::{SubscriptionRepository, SubscriptionRepositoryTrait, UserRepository};

use crate::auth::AuthUser;
use crate::billing::retry::{estimate_next_retry, RetryEstimate, RetryInputs};
use crate::billing::{
    BillingError, BillingEvent, BillingGateway, BillingInvoice, BillingSubscription, PaymentMethodSummary,
    WebhookEvent,
};
use crate::entities::conversions::{convert_to_domain_subscription, format_timestamp};
use crate::entities::{Subscription, SubscriptionOverview, SubscriptionStatus};
use crate::services::access::AccessControl;
use crate::services::{normalize_optional, ServiceError};

/// Invoices returned by [`SubscriptionServiceTrait::list_invoices`]
const INVOICE_LIMIT: u32 = 12;

/// Result of processing one webhook delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookOutcome {
    /// Provider event type, e.g. `invoice.payment_failed`
    pub event: String,
    /// Whether a local subscription was updated
    pub handled: bool,
}

#[async_trait]
pub trait SubscriptionServiceTrait: Send + Sync {
    /// Subscribe a client to a price, falling back to the configured default
    async fn subscribe(&self, actor: &AuthUser, client_id: &str, price_id: Option<String>) -> Result<SubscriptionOverview, ServiceError>;

    /// Local subscription plus a retry estimate when a payment is failing
    async fn get_subscription(&self, actor: &AuthUser, client_id: &str) -> Result<SubscriptionOverview, ServiceError>;

    async fn cancel(&self, actor: &AuthUser, client_id: &str) -> Result<Subscription, ServiceError>;

    async fn resume(&self, actor: &AuthUser, client_id: &str) -> Result<Subscription, ServiceError>;

    /// Pull the current state from the billing provider
    async fn refresh(&self, actor: &AuthUser, client_id: &str) -> Result<SubscriptionOverview, ServiceError>;

    async fn update_payment_method(&self, actor: &AuthUser, client_id: &str, payment_method_id: &str) -> Result<PaymentMethodSummary, ServiceError>;

    /// Cards saved with the provider, the current default first
    async fn list_payment_methods(&self, actor: &AuthUser, client_id: &str) -> Result<Vec<PaymentMethodSummary>, ServiceError>;

    async fn list_invoices(&self, actor: &AuthUser, client_id: &str) -> Result<Vec<BillingInvoice>, ServiceError>;

    /// Verify and apply a webhook delivery
    async fn handle_webhook(&self, payload: &str, signature_header: &str) -> Result<WebhookOutcome, ServiceError>;

    fn billing_configured(&self) -> bool;
}

pub struct SubscriptionService {
    subscriptions: Arc<dyn SubscriptionRepositoryTrait>,
    gateway: Arc<dyn BillingGateway>,
    access: AccessControl,
    default_price_id: Option<String>,
}

impl SubscriptionService {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepositoryTrait>,
        gateway: Arc<dyn BillingGateway>,
        access: AccessControl,
        default_price_id: Option<String>,
    ) -> Self {
        Self {
            subscriptions,
            gateway,
            access,
            default_price_id: normalize_optional(default_price_id),
        }
    }

    pub fn from_pool(pool: &DbPool, gateway: Arc<dyn BillingGateway>, default_price_id: Option<String>) -> Self {
        Self::new(
            Arc::new(SubscriptionRepository::new(pool.clone())),
            gateway,
            AccessControl::new(Arc::new(UserRepository::new(pool.clone()))),
            default_price_id,
        )
    }

    fn ensure_configured(&self) -> Result<(), ServiceError> {
        if self.gateway.is_configured() {
            Ok(())
        } else {
            Err(BillingError::Configuration("Billing is not configured".to_string()).into())
        }
    }

    async fn local(&self, client_id: &str) -> Result<Subscription, ServiceError> {
        let record = self
            .subscriptions
            .get_by_client(client_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Client {} has no subscription", client_id)))?;
        Ok(convert_to_domain_subscription(record)?)
    }

    /// Write the provider's view of a subscription to the local row
    async fn apply_remote(&self, remote: &BillingSubscription) -> Result<Subscription, ServiceError> {
        let record = self
            .subscriptions
            .update_status(&remote.id, status_update(remote))
            .await?;
        Ok(convert_to_domain_subscription(record)?)
    }

    async fn toggle_cancel(&self, actor: &AuthUser, client_id: &str, cancel: bool) -> Result<Subscription, ServiceError> {
        self.access.ensure_can_access_client(actor, client_id).await?;
        let subscription = self.local(client_id).await?;
        if subscription.status == SubscriptionStatus::Canceled {
            return Err(ServiceError::Validation("The subscription has already ended".to_string()));
        }
        self.ensure_configured()?;

        let remote = self
            .gateway
            .set_cancel_at_period_end(&subscription.subscription_id, cancel)
            .await?;
        let updated = self.apply_remote(&remote).await?;
        info!(
            "Subscription {} for client {} set cancel_at_period_end={}",
            updated.subscription_id, client_id, cancel
        );
        Ok(updated)
    }
}

fn status_update(remote: &BillingSubscription) -> SubscriptionStatusUpdate {
    SubscriptionStatusUpdate {
        status: remote.status.as_str().to_string(),
        current_period_end: remote.current_period_end.as_ref().map(format_timestamp),
        cancel_at_period_end: remote.cancel_at_period_end,
    }
}

fn retry_for(status: &SubscriptionStatus, remote: &BillingSubscription) -> Option<RetryEstimate> {
    let inputs = remote
        .latest_invoice
        .as_ref()
        .map(BillingInvoice::retry_inputs)
        .unwrap_or_else(RetryInputs::default);
    estimate_next_retry(status, &inputs, Utc::now())
}

fn overview(subscription: Subscription, remote: &BillingSubscription) -> SubscriptionOverview {
    let retry = retry_for(&subscription.status, remote);
    let client_secret = remote
        .latest_invoice
        .as_ref()
        .and_then(|invoice| invoice.payment_intent.as_ref())
        .and_then(|intent| intent.client_secret.clone());
    SubscriptionOverview { subscription, retry, client_secret }
}

#[async_trait]
impl SubscriptionServiceTrait for SubscriptionService {
    async fn subscribe(&self, actor: &AuthUser, client_id: &str, price_id: Option<String>) -> Result<SubscriptionOverview, ServiceError> {
        let client = self.access.ensure_coach_of(actor, client_id).await?;

        let existing = self.subscriptions.get_by_client(client_id).await?;
        if let Some(existing) = &existing {
            if SubscriptionStatus::from(existing.status.as_str()).is_ongoing() {
                return Err(ServiceError::Conflict(format!(
                    "Client {} already has a {} subscription",
                    client_id, existing.status
                )));
            }
        }

        let price_id = normalize_optional(price_id)
            .or_else(|| self.default_price_id.clone())
            .ok_or_else(|| ServiceError::Validation("A price id is required".to_string()))?;
        self.ensure_configured()?;

        let customer_id = match existing {
            Some(record) => record.customer_id,
            None => self.gateway.create_customer(&client.email, &client.name).await?.id,
        };
        let remote = self.gateway.create_subscription(&customer_id, &price_id).await?;

        let update = status_update(&remote);
        let record = self
            .subscriptions
            .upsert(SubscriptionUpsert {
                client_id: client_id.to_string(),
                coach_id: actor.user_id.clone(),
                customer_id,
                subscription_id: remote.id.clone(),
                price_id: remote.price_id.clone().unwrap_or(price_id),
                status: update.status,
                current_period_end: update.current_period_end,
                cancel_at_period_end: update.cancel_at_period_end,
            })
            .await?;

        info!("Client {} subscribed with status {}", client_id, remote.status);
        Ok(overview(convert_to_domain_subscription(record)?, &remote))
    }

    async fn get_subscription(&self, actor: &AuthUser, client_id: &str) -> Result<SubscriptionOverview, ServiceError> {
        self.access.ensure_can_access_client(actor, client_id).await?;
        let subscription = self.local(client_id).await?;

        if !subscription.status.is_retrying() || !self.gateway.is_configured() {
            return Ok(SubscriptionOverview { subscription, retry: None, client_secret: None });
        }

        match self.gateway.retrieve_subscription(&subscription.subscription_id).await {
            Ok(remote) => Ok(overview(subscription, &remote)),
            Err(e) => {
                warn!("Could not load retry details for {}: {}", subscription.subscription_id, e);
                Ok(SubscriptionOverview { subscription, retry: None, client_secret: None })
            }
        }
    }

    async fn cancel(&self, actor: &AuthUser, client_id: &str) -> Result<Subscription, ServiceError> {
        self.toggle_cancel(actor, client_id, true).await
    }

    async fn resume(&self, actor: &AuthUser, client_id: &str) -> Result<Subscription, ServiceError> {
        self.toggle_cancel(actor, client_id, false).await
    }

    async fn refresh(&self, actor: &AuthUser, client_id: &str) -> Result<SubscriptionOverview, ServiceError> {
        self.access.ensure_can_access_client(actor, client_id).await?;
        let subscription = self.local(client_id).await?;
        self.ensure_configured()?;

        let remote = self.gateway.retrieve_subscription(&subscription.subscription_id).await?;
        let updated = self.apply_remote(&remote).await?;
        Ok(overview(updated, &remote))
    }

    async fn update_payment_method(&self, actor: &AuthUser, client_id: &str, payment_method_id: &str) -> Result<PaymentMethodSummary, ServiceError> {
        self.access.ensure_can_access_client(actor, client_id).await?;
        let payment_method_id = payment_method_id.trim();
        if payment_method_id.is_empty() {
            return Err(ServiceError::Validation("A payment method id is required".to_string()));
        }
        let subscription = self.local(client_id).await?;
        self.ensure_configured()?;

        let method = self
            .gateway
            .attach_payment_method(&subscription.customer_id, payment_method_id)
            .await?;
        info!("Updated default payment method for client {}", client_id);
        Ok(method)
    }

    async fn list_payment_methods(&self, actor: &AuthUser, client_id: &str) -> Result<Vec<PaymentMethodSummary>, ServiceError> {
        self.access.ensure_can_access_client(actor, client_id).await?;
        let subscription = self.local(client_id).await?;
        self.ensure_configured()?;

        Ok(self.gateway.list_payment_methods(&subscription.customer_id).await?)
    }

    async fn list_invoices(&self, actor: &AuthUser, client_id: &str) -> Result<Vec<BillingInvoice>, ServiceError> {
        self.access.ensure_can_access_client(actor, client_id).await?;
        let subscription = self.local(client_id).await?;
        self.ensure_configured()?;

        Ok(self.gateway.list_invoices(&subscription.customer_id, INVOICE_LIMIT).await?)
    }

    async fn handle_webhook(&self, payload: &str, signature_header: &str) -> Result<WebhookOutcome, ServiceError> {
        let WebhookEvent { event_type: name, event } = self.gateway.parse_webhook(payload, signature_header)?;

        let subscription_id = match &event {
            BillingEvent::SubscriptionUpdated(remote) | BillingEvent::SubscriptionDeleted(remote) => Some(remote.id.clone()),
            BillingEvent::PaymentFailed(invoice) | BillingEvent::PaymentSucceeded(invoice) => invoice.subscription_id.clone(),
            BillingEvent::Ignored => None,
        };
        let Some(subscription_id) = subscription_id else {
            info!("Acknowledged webhook event {}", name);
            return Ok(WebhookOutcome { event: name, handled: false });
        };

        if self.subscriptions.get_by_subscription_id(&subscription_id).await?.is_none() {
            info!("Webhook event {} for unknown subscription {}", name, subscription_id);
            return Ok(WebhookOutcome { event: name, handled: false });
        }

        let remote = match event {
            BillingEvent::SubscriptionUpdated(remote) | BillingEvent::SubscriptionDeleted(remote) => remote,
            _ => self.gateway.retrieve_subscription(&subscription_id).await?,
        };
        let updated = self.apply_remote(&remote).await?;
        info!("Webhook event {} set subscription {} to {}", name, subscription_id, updated.status);

        Ok(WebhookOutcome { event: name, handled: true })
    }

    fn billing_configured(&self) -> bool {
        self.gateway.is_configured()
    }
}
