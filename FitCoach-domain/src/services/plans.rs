use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use fit_coach_data::database::DbPool;
use fit_coach_data::models::plan::{NewPlan, PlanKind, PlanRecord, PlanUpdate};
use fit_coach_data::repository::{PlanRepository, PlanRepositoryTrait, UserRepository};

use crate::auth::AuthUser;
use crate::entities::conversions::{convert_to_domain_meal_plan, convert_to_domain_workout_plan, to_json};
use crate::entities::{MealPlan, MealPlanInput, WorkoutPlan, WorkoutPlanInput};
use crate::services::access::AccessControl;
use crate::services::{normalize_optional, ServiceError};

/// Meal and workout plans. Coaches write, clients read their own.
#[async_trait]
pub trait PlanServiceTrait: Send + Sync {
    async fn list_meal_plans(&self, actor: &AuthUser, client_id: &str) -> Result<Vec<MealPlan>, ServiceError>;
    async fn create_meal_plan(&self, actor: &AuthUser, client_id: &str, input: MealPlanInput) -> Result<MealPlan, ServiceError>;
    async fn get_meal_plan(&self, actor: &AuthUser, plan_id: &str) -> Result<MealPlan, ServiceError>;
    async fn update_meal_plan(&self, actor: &AuthUser, plan_id: &str, input: MealPlanInput) -> Result<MealPlan, ServiceError>;
    async fn delete_meal_plan(&self, actor: &AuthUser, plan_id: &str) -> Result<(), ServiceError>;
    /// Make this the client's active meal plan
    async fn activate_meal_plan(&self, actor: &AuthUser, plan_id: &str) -> Result<MealPlan, ServiceError>;

    async fn list_workout_plans(&self, actor: &AuthUser, client_id: &str) -> Result<Vec<WorkoutPlan>, ServiceError>;
    async fn create_workout_plan(&self, actor: &AuthUser, client_id: &str, input: WorkoutPlanInput) -> Result<WorkoutPlan, ServiceError>;
    async fn get_workout_plan(&self, actor: &AuthUser, plan_id: &str) -> Result<WorkoutPlan, ServiceError>;
    async fn update_workout_plan(&self, actor: &AuthUser, plan_id: &str, input: WorkoutPlanInput) -> Result<WorkoutPlan, ServiceError>;
    async fn delete_workout_plan(&self, actor: &AuthUser, plan_id: &str) -> Result<(), ServiceError>;
    async fn activate_workout_plan(&self, actor: &AuthUser, plan_id: &str) -> Result<WorkoutPlan, ServiceError>;
}

pub struct PlanService {
    plans: Arc<dyn PlanRepositoryTrait>,
    access: AccessControl,
}

impl PlanService {
    pub fn new(plans: Arc<dyn PlanRepositoryTrait>, access: AccessControl) -> Self {
        Self { plans, access }
    }

    pub fn from_pool(pool: &DbPool) -> Self {
        Self::new(
            Arc::new(PlanRepository::new(pool.clone())),
            AccessControl::new(Arc::new(UserRepository::new(pool.clone()))),
        )
    }

    async fn load(&self, kind: PlanKind, plan_id: &str) -> Result<PlanRecord, ServiceError> {
        self.plans
            .get(kind, plan_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Plan {} not found", plan_id)))
    }

    async fn readable(&self, actor: &AuthUser, kind: PlanKind, plan_id: &str) -> Result<PlanRecord, ServiceError> {
        let record = self.load(kind, plan_id).await?;
        self.access.ensure_can_access_client(actor, &record.client_id).await?;
        Ok(record)
    }

    async fn writable(&self, actor: &AuthUser, kind: PlanKind, plan_id: &str) -> Result<PlanRecord, ServiceError> {
        let record = self.load(kind, plan_id).await?;
        self.access.ensure_coach_of(actor, &record.client_id).await?;
        Ok(record)
    }

    async fn list(&self, actor: &AuthUser, kind: PlanKind, client_id: &str) -> Result<Vec<PlanRecord>, ServiceError> {
        self.access.ensure_can_access_client(actor, client_id).await?;
        Ok(self.plans.list_by_client(kind, client_id).await?)
    }

    async fn create(
        &self,
        actor: &AuthUser,
        kind: PlanKind,
        client_id: &str,
        name: &str,
        description: Option<String>,
        document_json: String,
    ) -> Result<PlanRecord, ServiceError> {
        self.access.ensure_coach_of(actor, client_id).await?;
        let record = self
            .plans
            .create(
                kind,
                NewPlan {
                    client_id: client_id.to_string(),
                    coach_id: actor.user_id.clone(),
                    name: name.trim().to_string(),
                    description: normalize_optional(description),
                    document_json,
                },
            )
            .await?;
        info!("Created {:?} plan {} for client {}", kind, record.id, client_id);
        Ok(record)
    }

    async fn update(
        &self,
        actor: &AuthUser,
        kind: PlanKind,
        plan_id: &str,
        name: &str,
        description: Option<String>,
        document_json: String,
    ) -> Result<PlanRecord, ServiceError> {
        self.writable(actor, kind, plan_id).await?;
        Ok(self
            .plans
            .update(
                kind,
                plan_id,
                PlanUpdate {
                    name: name.trim().to_string(),
                    description: normalize_optional(description),
                    document_json,
                },
            )
            .await?)
    }

    async fn delete(&self, actor: &AuthUser, kind: PlanKind, plan_id: &str) -> Result<(), ServiceError> {
        self.writable(actor, kind, plan_id).await?;
        self.plans.delete(kind, plan_id).await?;
        info!("Deleted {:?} plan {}", kind, plan_id);
        Ok(())
    }

    async fn activate(&self, actor: &AuthUser, kind: PlanKind, plan_id: &str) -> Result<PlanRecord, ServiceError> {
        self.writable(actor, kind, plan_id).await?;
        Ok(self.plans.set_active(kind, plan_id).await?)
    }
}

fn meal_plans(records: Vec<PlanRecord>) -> Result<Vec<MealPlan>, ServiceError> {
    records
        .into_iter()
        .map(|r| convert_to_domain_meal_plan(r).map_err(ServiceError::from))
        .collect()
}

fn workout_plans(records: Vec<PlanRecord>) -> Result<Vec<WorkoutPlan>, ServiceError> {
    records
        .into_iter()
        .map(|r| convert_to_domain_workout_plan(r).map_err(ServiceError::from))
        .collect()
}

#[async_trait]
impl PlanServiceTrait for PlanService {
    async fn list_meal_plans(&self, actor: &AuthUser, client_id: &str) -> Result<Vec<MealPlan>, ServiceError> {
        meal_plans(self.list(actor, PlanKind::Meal, client_id).await?)
    }

    async fn create_meal_plan(&self, actor: &AuthUser, client_id: &str, input: MealPlanInput) -> Result<MealPlan, ServiceError> {
        input.validate_content().map_err(ServiceError::Validation)?;
        let document = to_json(&input.meals)?;
        let record = self
            .create(actor, PlanKind::Meal, client_id, &input.name, input.description, document)
            .await?;
        Ok(convert_to_domain_meal_plan(record)?)
    }

    async fn get_meal_plan(&self, actor: &AuthUser, plan_id: &str) -> Result<MealPlan, ServiceError> {
        Ok(convert_to_domain_meal_plan(self.readable(actor, PlanKind::Meal, plan_id).await?)?)
    }

    async fn update_meal_plan(&self, actor: &AuthUser, plan_id: &str, input: MealPlanInput) -> Result<MealPlan, ServiceError> {
        input.validate_content().map_err(ServiceError::Validation)?;
        let document = to_json(&input.meals)?;
        let record = self
            .update(actor, PlanKind::Meal, plan_id, &input.name, input.description, document)
            .await?;
        Ok(convert_to_domain_meal_plan(record)?)
    }

    async fn delete_meal_plan(&self, actor: &AuthUser, plan_id: &str) -> Result<(), ServiceError> {
        self.delete(actor, PlanKind::Meal, plan_id).await
    }

    async fn activate_meal_plan(&self, actor: &AuthUser, plan_id: &str) -> Result<MealPlan, ServiceError> {
        Ok(convert_to_domain_meal_plan(self.activate(actor, PlanKind::Meal, plan_id).await?)?)
    }

    async fn list_workout_plans(&self, actor: &AuthUser, client_id: &str) -> Result<Vec<WorkoutPlan>, ServiceError> {
        workout_plans(self.list(actor, PlanKind::Workout, client_id).await?)
    }

    async fn create_workout_plan(&self, actor: &AuthUser, client_id: &str, input: WorkoutPlanInput) -> Result<WorkoutPlan, ServiceError> {
        input.validate_content().map_err(ServiceError::Validation)?;
        let document = to_json(&input.days)?;
        let record = self
            .create(actor, PlanKind::Workout, client_id, &input.name, input.description, document)
            .await?;
        Ok(convert_to_domain_workout_plan(record)?)
    }

    async fn get_workout_plan(&self, actor: &AuthUser, plan_id: &str) -> Result<WorkoutPlan, ServiceError> {
        Ok(convert_to_domain_workout_plan(self.readable(actor, PlanKind::Workout, plan_id).await?)?)
    }

    async fn update_workout_plan(&self, actor: &AuthUser, plan_id: &str, input: WorkoutPlanInput) -> Result<WorkoutPlan, ServiceError> {
        input.validate_content().map_err(ServiceError::Validation)?;
        let document = to_json(&input.days)?;
        let record = self
            .update(actor, PlanKind::Workout, plan_id, &input.name, input.description, document)
            .await?;
        Ok(convert_to_domain_workout_plan(record)?)
    }

    async fn delete_workout_plan(&self, actor: &AuthUser, plan_id: &str) -> Result<(), ServiceError> {
        self.delete(actor, PlanKind::Workout, plan_id).await
    }

    async fn activate_workout_plan(&self, actor: &AuthUser, plan_id: &str) -> Result<WorkoutPlan, ServiceError> {
        Ok(convert_to_domain_workout_plan(self.activate(actor, PlanKind::Workout, plan_id).await?)?)
    }
}
