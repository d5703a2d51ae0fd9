use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument};

use fit_coach_data::database::DbPool;
use fit_coach_data::repository::{
    CheckInRepository, CheckInRepositoryTrait, HabitRepository, HabitRepositoryTrait, MessageRepository,
    MessageRepositoryTrait, SubscriptionRepository, SubscriptionRepositoryTrait, UserRepository,
    UserRepositoryTrait,
};

use crate::auth::AuthUser;
use crate::entities::conversions::{
    convert_to_domain_completion, convert_to_domain_habit, convert_to_domain_user, format_date, parse_timestamp,
};
use crate::entities::habit::iso_week_bounds;
use crate::entities::{ClientOverview, NewAccountInput, Role, User};
use crate::services::access::{require_coach, AccessControl};
use crate::services::accounts::create_account;
use crate::services::habits::weekly_progress;
use crate::services::ServiceError;

/// A coach's client roster
#[async_trait]
pub trait ClientServiceTrait: Send + Sync {
    /// Dashboard rows for every client of the calling coach
    async fn list_clients(&self, actor: &AuthUser) -> Result<Vec<ClientOverview>, ServiceError>;

    /// Create a client account owned by the calling coach
    async fn create_client(&self, actor: &AuthUser, input: NewAccountInput) -> Result<User, ServiceError>;

    async fn get_client(&self, actor: &AuthUser, client_id: &str) -> Result<User, ServiceError>;
}

pub struct ClientService {
    users: Arc<dyn UserRepositoryTrait>,
    habits: Arc<dyn HabitRepositoryTrait>,
    check_ins: Arc<dyn CheckInRepositoryTrait>,
    subscriptions: Arc<dyn SubscriptionRepositoryTrait>,
    messages: Arc<dyn MessageRepositoryTrait>,
    access: AccessControl,
}

impl ClientService {
    pub fn from_pool(pool: &DbPool) -> Self {
        let users: Arc<dyn UserRepositoryTrait> = Arc::new(UserRepository::new(pool.clone()));
        Self {
            access: AccessControl::new(users.clone()),
            users,
            habits: Arc::new(HabitRepository::new(pool.clone())),
            check_ins: Arc::new(CheckInRepository::new(pool.clone())),
            subscriptions: Arc::new(SubscriptionRepository::new(pool.clone())),
            messages: Arc::new(MessageRepository::new(pool.clone())),
        }
    }

    async fn overview(&self, client: User, unread: &HashMap<String, usize>) -> Result<ClientOverview, ServiceError> {
        let subscription_status = self
            .subscriptions
            .get_by_client(&client.id)
            .await?
            .map(|s| s.status);

        let last_check_in_at = match self.check_ins.latest_for_client(&client.id).await? {
            Some(record) => Some(parse_timestamp(&record.created_at)?),
            None => None,
        };

        let today = Utc::now().date_naive();
        let (week_start, week_end) = iso_week_bounds(today);
        let mut completed = 0;
        let mut target = 0;
        for record in self.habits.list_habits(&client.id, false).await? {
            let habit = convert_to_domain_habit(record)?;
            let completions = self
                .habits
                .list_completions(&habit.id, &format_date(week_start), &format_date(week_end))
                .await?
                .into_iter()
                .map(convert_to_domain_completion)
                .collect::<Result<Vec<_>, _>>()?;
            let progress = weekly_progress(&habit, &completions, today);
            completed += progress.completed;
            target += progress.target;
        }

        Ok(ClientOverview {
            unread_messages: unread.get(&client.id).copied().unwrap_or(0),
            client,
            subscription_status,
            last_check_in_at,
            habits_completed_this_week: completed,
            habits_target_this_week: target,
        })
    }
}

#[async_trait]
impl ClientServiceTrait for ClientService {
    #[instrument(skip(self, actor), fields(coach_id = %actor.user_id))]
    async fn list_clients(&self, actor: &AuthUser) -> Result<Vec<ClientOverview>, ServiceError> {
        require_coach(actor)?;

        let unread: HashMap<String, usize> = self
            .messages
            .unread_counts(&actor.user_id)
            .await?
            .into_iter()
            .map(|u| (u.sender_id, u.count))
            .collect();

        let records = self.users.list_clients(&actor.user_id).await?;
        debug!("Building overview for {} clients", records.len());

        let mut overviews = Vec::with_capacity(records.len());
        for record in records {
            let client = convert_to_domain_user(record)?;
            overviews.push(self.overview(client, &unread).await?);
        }
        Ok(overviews)
    }

    #[instrument(skip(self, actor, input), fields(coach_id = %actor.user_id))]
    async fn create_client(&self, actor: &AuthUser, input: NewAccountInput) -> Result<User, ServiceError> {
        require_coach(actor)?;
        let client = create_account(self.users.as_ref(), input, Role::Client, Some(actor.user_id.clone())).await?;
        info!("Coach {} added client {}", actor.user_id, client.id);
        Ok(client)
    }

    async fn get_client(&self, actor: &AuthUser, client_id: &str) -> Result<User, ServiceError> {
        self.access.ensure_can_access_client(actor, client_id).await
    }
}
