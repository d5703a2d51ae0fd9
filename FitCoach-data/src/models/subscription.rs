use serde::{Deserialize, Serialize};

/// Local mirror of a billing provider subscription
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionRecord {
    pub id: String,
    pub client_id: String,
    pub coach_id: String,
    pub customer_id: String,
    /// Subscription id at the billing provider
    pub subscription_id: String,
    pub price_id: String,
    pub status: String,
    pub current_period_end: Option<String>,
    pub cancel_at_period_end: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Full subscription state written when a client subscribes or resubscribes
#[derive(Debug, Clone)]
pub struct SubscriptionUpsert {
    pub client_id: String,
    pub coach_id: String,
    pub customer_id: String,
    pub subscription_id: String,
    pub price_id: String,
    pub status: String,
    pub current_period_end: Option<String>,
    pub cancel_at_period_end: bool,
}

/// Fields refreshed from the billing provider
#[derive(Debug, Clone)]
pub struct SubscriptionStatusUpdate {
    pub status: String,
    pub current_period_end: Option<String>,
    pub cancel_at_period_end: bool,
}
