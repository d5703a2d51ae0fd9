use std::sync::Arc;

use axum::extract::FromRef;

use fit_coach_data::database::DbPool;
use fit_coach_domain::auth::token::TokenService;
use fit_coach_domain::billing::BillingGateway;
use fit_coach_domain::health::{HealthService as DomainHealthService, HealthServiceTrait};
use fit_coach_domain::services::{
    AccountService as DomainAccountService, AccountServiceTrait, ChatService as DomainChatService, ChatServiceTrait,
    CheckInService as DomainCheckInService, CheckInServiceTrait, ClientService as DomainClientService,
    ClientServiceTrait, HabitService as DomainHabitService, HabitServiceTrait, PlanService as DomainPlanService,
    PlanServiceTrait, SubscriptionService as DomainSubscriptionService, SubscriptionServiceTrait,
};

/// Service types for dependency injection
pub type AccountService = Arc<dyn AccountServiceTrait>;
pub type ClientService = Arc<dyn ClientServiceTrait>;
pub type PlanService = Arc<dyn PlanServiceTrait>;
pub type HabitService = Arc<dyn HabitServiceTrait>;
pub type CheckInService = Arc<dyn CheckInServiceTrait>;
pub type SubscriptionService = Arc<dyn SubscriptionServiceTrait>;
pub type ChatService = Arc<dyn ChatServiceTrait>;
pub type HealthService = Arc<dyn HealthServiceTrait>;

/// Shared state of the router. Handlers extract the one service they need.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub accounts: AccountService,
    pub clients: ClientService,
    pub plans: PlanService,
    pub habits: HabitService,
    pub check_ins: CheckInService,
    pub subscriptions: SubscriptionService,
    pub chat: ChatService,
    pub health: HealthService,
}

impl AppState {
    /// Wire every service over one pool and billing gateway
    pub fn new(
        pool: &DbPool,
        tokens: Arc<TokenService>,
        gateway: Arc<dyn BillingGateway>,
        default_price_id: Option<String>,
        environment: &str,
    ) -> Self {
        let billing_configured = gateway.is_configured();

        Self {
            accounts: Arc::new(DomainAccountService::from_pool(pool, tokens.clone())),
            clients: Arc::new(DomainClientService::from_pool(pool)),
            plans: Arc::new(DomainPlanService::from_pool(pool)),
            habits: Arc::new(DomainHabitService::from_pool(pool)),
            check_ins: Arc::new(DomainCheckInService::from_pool(pool)),
            subscriptions: Arc::new(DomainSubscriptionService::from_pool(pool, gateway, default_price_id)),
            chat: Arc::new(DomainChatService::from_pool(pool)),
            health: Arc::new(DomainHealthService::new(pool.clone(), billing_configured, environment)),
            tokens,
        }
    }
}
