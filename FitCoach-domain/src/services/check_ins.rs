use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use fit_coach_data::database::DbPool;
use fit_coach_data::models::check_in::{NewCheckIn, NewCheckInForm};
use fit_coach_data::repository::{CheckInRepository, CheckInRepositoryTrait, UserRepository};

use crate::auth::AuthUser;
use crate::entities::check_in::{CheckInFormInput, CheckInInput};
use crate::entities::conversions::{convert_to_domain_check_in, convert_to_domain_form, to_json};
use crate::entities::{CheckIn, CheckInForm, CheckInKind, Page, PageRequest, Role};
use crate::services::access::{require_coach, AccessControl};
use crate::services::{normalize_optional, ServiceError};

const MAX_QUESTIONS: usize = 30;
const MAX_NOTE_LENGTH: usize = 4000;

#[async_trait]
pub trait CheckInServiceTrait: Send + Sync {
    async fn create_form(&self, actor: &AuthUser, input: CheckInFormInput) -> Result<CheckInForm, ServiceError>;

    /// A coach's own forms, or for a client the forms of their coach
    async fn list_forms(&self, actor: &AuthUser) -> Result<Vec<CheckInForm>, ServiceError>;

    /// Clients submit for themselves; coaches log for their clients
    async fn create_check_in(&self, actor: &AuthUser, client_id: &str, input: CheckInInput) -> Result<CheckIn, ServiceError>;

    async fn list_check_ins(&self, actor: &AuthUser, client_id: &str, page: PageRequest) -> Result<Page<CheckIn>, ServiceError>;
}

pub struct CheckInService {
    check_ins: Arc<dyn CheckInRepositoryTrait>,
    access: AccessControl,
}

impl CheckInService {
    pub fn new(check_ins: Arc<dyn CheckInRepositoryTrait>, access: AccessControl) -> Self {
        Self { check_ins, access }
    }

    pub fn from_pool(pool: &DbPool) -> Self {
        Self::new(
            Arc::new(CheckInRepository::new(pool.clone())),
            AccessControl::new(Arc::new(UserRepository::new(pool.clone()))),
        )
    }
}

#[async_trait]
impl CheckInServiceTrait for CheckInService {
    async fn create_form(&self, actor: &AuthUser, input: CheckInFormInput) -> Result<CheckInForm, ServiceError> {
        require_coach(actor)?;

        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(ServiceError::Validation("Form title must not be empty".to_string()));
        }
        let questions: Vec<String> = input.questions.iter().map(|q| q.trim().to_string()).collect();
        if questions.is_empty() || questions.len() > MAX_QUESTIONS {
            return Err(ServiceError::Validation(format!(
                "A form needs between 1 and {} questions",
                MAX_QUESTIONS
            )));
        }
        if questions.iter().any(|q| q.is_empty()) {
            return Err(ServiceError::Validation("Questions must not be empty".to_string()));
        }
        for (i, question) in questions.iter().enumerate() {
            if questions[..i].contains(question) {
                return Err(ServiceError::Validation(format!("Duplicate question '{}'", question)));
            }
        }

        let record = self
            .check_ins
            .create_form(NewCheckInForm {
                coach_id: actor.user_id.clone(),
                title,
                questions_json: to_json(&questions)?,
            })
            .await?;
        Ok(convert_to_domain_form(record)?)
    }

    async fn list_forms(&self, actor: &AuthUser) -> Result<Vec<CheckInForm>, ServiceError> {
        let coach_id = match actor.role {
            Role::Coach => actor.user_id.clone(),
            Role::Client => {
                let client = self.access.load_user(&actor.user_id).await?;
                match client.coach_id {
                    Some(coach_id) => coach_id,
                    None => return Ok(Vec::new()),
                }
            }
        };

        self.check_ins
            .list_forms(&coach_id)
            .await?
            .into_iter()
            .map(|r| convert_to_domain_form(r).map_err(ServiceError::from))
            .collect()
    }

    async fn create_check_in(&self, actor: &AuthUser, client_id: &str, input: CheckInInput) -> Result<CheckIn, ServiceError> {
        let client = self.access.ensure_can_access_client(actor, client_id).await?;
        let kind = match actor.role {
            Role::Client => CheckInKind::ClientSubmitted,
            Role::Coach => CheckInKind::CoachLogged,
        };

        let note = normalize_optional(input.note);
        if note.as_ref().map(|n| n.chars().count() > MAX_NOTE_LENGTH).unwrap_or(false) {
            return Err(ServiceError::Validation(format!(
                "Note must be at most {} characters",
                MAX_NOTE_LENGTH
            )));
        }
        if let Some(weight) = input.weight_kg {
            if !weight.is_finite() || weight <= 0.0 || weight >= 1000.0 {
                return Err(ServiceError::Validation("Weight must be between 0 and 1000 kg".to_string()));
            }
        }

        if let Some(form_id) = input.form_id.as_deref() {
            let form = self
                .check_ins
                .get_form(form_id)
                .await?
                .ok_or_else(|| ServiceError::Validation(format!("Check-in form {} does not exist", form_id)))?;
            let form = convert_to_domain_form(form)?;
            if client.coach_id.as_deref() != Some(form.coach_id.as_str()) {
                return Err(ServiceError::Validation("The form belongs to another coach".to_string()));
            }
            form.check_responses(&input.responses).map_err(ServiceError::Validation)?;
        } else if !input.responses.is_empty() {
            return Err(ServiceError::Validation("Responses require a form".to_string()));
        }

        if note.is_none() && input.responses.is_empty() && input.weight_kg.is_none() {
            return Err(ServiceError::Validation(
                "A check-in needs a note, form responses or a weight".to_string(),
            ));
        }

        let record = self
            .check_ins
            .create(NewCheckIn {
                client_id: client_id.to_string(),
                author_id: actor.user_id.clone(),
                kind: kind.as_str().to_string(),
                note,
                form_id: input.form_id,
                responses_json: to_json(&input.responses)?,
                weight_kg: input.weight_kg,
            })
            .await?;

        info!("Recorded {} check-in {} for client {}", kind.as_str(), record.id, client_id);
        Ok(convert_to_domain_check_in(record)?)
    }

    async fn list_check_ins(&self, actor: &AuthUser, client_id: &str, page: PageRequest) -> Result<Page<CheckIn>, ServiceError> {
        self.access.ensure_can_access_client(actor, client_id).await?;
        let (records, total) = self.check_ins.list_by_client(client_id, page.limit, page.offset).await?;
        let items = records
            .into_iter()
            .map(|r| convert_to_domain_check_in(r).map_err(ServiceError::from))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page { items, total, limit: page.limit, offset: page.offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::CheckInResponse;
    use crate::services::test_support::{client, coach, pool};

    fn answer(question: &str, answer: &str) -> CheckInResponse {
        CheckInResponse { question: question.to_string(), answer: answer.to_string() }
    }

    #[tokio::test]
    async fn test_form_responses_must_match() {
        let pool = pool();
        let coach = coach(&pool, "coach@example.com").await;
        let client = client(&pool, &coach, "client@example.com").await;
        let service = CheckInService::from_pool(&pool);

        let form = service
            .create_form(
                &coach,
                CheckInFormInput { title: "Weekly".to_string(), questions: vec!["Energy?".to_string(), "Sleep?".to_string()] },
            )
            .await
            .unwrap();
        assert_eq!(service.list_forms(&client).await.unwrap().len(), 1);

        let partial = CheckInInput {
            form_id: Some(form.id.clone()),
            responses: vec![answer("Energy?", "Good")],
            ..Default::default()
        };
        assert!(matches!(
            service.create_check_in(&client, &client.user_id, partial).await,
            Err(ServiceError::Validation(_))
        ));

        let complete = CheckInInput {
            form_id: Some(form.id.clone()),
            responses: vec![answer("Energy?", "Good"), answer("Sleep?", "7h")],
            weight_kg: Some(72.5),
            ..Default::default()
        };
        let check_in = service.create_check_in(&client, &client.user_id, complete).await.unwrap();
        assert_eq!(check_in.kind, CheckInKind::ClientSubmitted);
        assert_eq!(check_in.responses.len(), 2);
    }

    #[tokio::test]
    async fn test_coach_logs_and_lists_paginated() {
        let pool = pool();
        let coach = coach(&pool, "coach@example.com").await;
        let client = client(&pool, &coach, "client@example.com").await;
        let service = CheckInService::from_pool(&pool);

        for i in 0..3 {
            let input = CheckInInput { note: Some(format!("Session {}", i)), ..Default::default() };
            let check_in = service.create_check_in(&coach, &client.user_id, input).await.unwrap();
            assert_eq!(check_in.kind, CheckInKind::CoachLogged);
        }

        let page = service
            .list_check_ins(&client, &client.user_id, PageRequest::new(Some(2), None))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].note.as_deref(), Some("Session 2"));
        assert!(page.has_next());
    }

    #[tokio::test]
    async fn test_empty_check_in_is_rejected() {
        let pool = pool();
        let coach = coach(&pool, "coach@example.com").await;
        let client = client(&pool, &coach, "client@example.com").await;
        let service = CheckInService::from_pool(&pool);

        let result = service
            .create_check_in(&client, &client.user_id, CheckInInput { note: Some("   ".to_string()), ..Default::default() })
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_other_coach_cannot_log() {
        let pool = pool();
        let coach_a = coach(&pool, "a@example.com").await;
        let coach_b = coach(&pool, "b@example.com").await;
        let client = client(&pool, &coach_a, "client@example.com").await;
        let service = CheckInService::from_pool(&pool);

        let result = service
            .create_check_in(&coach_b, &client.user_id, CheckInInput { note: Some("Hi".to_string()), ..Default::default() })
            .await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }
}
