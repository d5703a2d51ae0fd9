use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use fit_coach_data::database::DbPool;
use fit_coach_data::models::message::NewMessage;
use fit_coach_data::repository::{MessageRepository, MessageRepositoryTrait, UserRepository};

use crate::auth::AuthUser;
use crate::entities::conversions::convert_to_domain_message;
use crate::entities::message::MAX_MESSAGE_LENGTH;
use crate::entities::{Message, Page, PageRequest, Role, SenderUnread, UnreadSummary};
use crate::services::access::AccessControl;
use crate::services::ServiceError;

#[async_trait]
pub trait ChatServiceTrait: Send + Sync {
    async fn send_message(&self, actor: &AuthUser, recipient_id: &str, body: &str) -> Result<Message, ServiceError>;

    /// Messages between the caller and `other_id`, newest first. With
    /// `mark_read` the messages addressed to the caller are marked read
    /// before the page is loaded.
    async fn conversation(&self, actor: &AuthUser, other_id: &str, page: PageRequest, mark_read: bool) -> Result<Page<Message>, ServiceError>;

    async fn unread(&self, actor: &AuthUser) -> Result<UnreadSummary, ServiceError>;
}

pub struct ChatService {
    messages: Arc<dyn MessageRepositoryTrait>,
    access: AccessControl,
}

impl ChatService {
    pub fn new(messages: Arc<dyn MessageRepositoryTrait>, access: AccessControl) -> Self {
        Self { messages, access }
    }

    pub fn from_pool(pool: &DbPool) -> Self {
        Self::new(
            Arc::new(MessageRepository::new(pool.clone())),
            AccessControl::new(Arc::new(UserRepository::new(pool.clone()))),
        )
    }

    /// Only a coach and one of their clients may talk to each other
    async fn ensure_participants(&self, actor: &AuthUser, other_id: &str) -> Result<(), ServiceError> {
        if actor.user_id == other_id {
            return Err(ServiceError::Validation("You cannot message yourself".to_string()));
        }

        match actor.role {
            Role::Coach => {
                self.access.ensure_can_access_client(actor, other_id).await?;
            }
            Role::Client => {
                let other = self.access.load_user(other_id).await?;
                let me = self.access.load_user(&actor.user_id).await?;
                if me.coach_id.as_deref() != Some(other.id.as_str()) {
                    return Err(ServiceError::Forbidden("You can only message your coach".to_string()));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ChatServiceTrait for ChatService {
    async fn send_message(&self, actor: &AuthUser, recipient_id: &str, body: &str) -> Result<Message, ServiceError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ServiceError::Validation("Message must not be empty".to_string()));
        }
        if body.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ServiceError::Validation(format!(
                "Message must be at most {} characters",
                MAX_MESSAGE_LENGTH
            )));
        }
        self.ensure_participants(actor, recipient_id).await?;

        let record = self
            .messages
            .insert(NewMessage {
                sender_id: actor.user_id.clone(),
                recipient_id: recipient_id.to_string(),
                body: body.to_string(),
            })
            .await?;
        debug!("Message {} sent from {} to {}", record.id, actor.user_id, recipient_id);
        Ok(convert_to_domain_message(record)?)
    }

    async fn conversation(&self, actor: &AuthUser, other_id: &str, page: PageRequest, mark_read: bool) -> Result<Page<Message>, ServiceError> {
        self.ensure_participants(actor, other_id).await?;

        if mark_read {
            let marked = self.messages.mark_read(&actor.user_id, other_id).await?;
            debug!("Marked {} messages from {} as read", marked, other_id);
        }

        let (records, total) = self
            .messages
            .conversation(&actor.user_id, other_id, page.limit, page.offset)
            .await?;
        let items = records
            .into_iter()
            .map(|r| convert_to_domain_message(r).map_err(ServiceError::from))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page { items, total, limit: page.limit, offset: page.offset })
    }

    async fn unread(&self, actor: &AuthUser) -> Result<UnreadSummary, ServiceError> {
        let by_sender: Vec<SenderUnread> = self
            .messages
            .unread_counts(&actor.user_id)
            .await?
            .into_iter()
            .map(|c| SenderUnread { sender_id: c.sender_id, count: c.count })
            .collect();
        let total = by_sender.iter().map(|s| s.count).sum();

        Ok(UnreadSummary { total, by_sender })
    }
}
