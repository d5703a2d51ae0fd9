use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use tracing::{info, instrument};

use fit_coach_domain::auth::AuthUser;
use fit_coach_domain::entities::WorkoutPlan;

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::handlers::validate_request;
use crate::api::state::PlanService;
use crate::entities::plans::WorkoutPlanRequest;

#[utoipa::path(
    get,
    path = "/api/v1/clients/{client_id}/workout-plans",
    params(("client_id" = String, Path, description = "Client user ID")),
    responses(
        (status = 200, description = "Workout plans of the client, newest first", body = [WorkoutPlan]),
        (status = 403, description = "Not the client or their coach", body = ErrorResponse),
        (status = 404, description = "Client not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "workout_plans"
)]
#[instrument(skip(service, user))]
pub async fn list_workout_plans(
    State(service): State<PlanService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
) -> ApiResult<Json<Vec<WorkoutPlan>>> {
    let plans = service.list_workout_plans(&user, &client_id).await?;
    Ok(Json(plans))
}

#[utoipa::path(
    post,
    path = "/api/v1/clients/{client_id}/workout-plans",
    params(("client_id" = String, Path, description = "Client user ID")),
    request_body = WorkoutPlanRequest,
    responses(
        (status = 201, description = "Workout plan created", body = WorkoutPlan),
        (status = 400, description = "Invalid plan", body = ErrorResponse),
        (status = 403, description = "Coaches only", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "workout_plans"
)]
#[instrument(skip(service, user, request))]
pub async fn create_workout_plan(
    State(service): State<PlanService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
    Json(request): Json<WorkoutPlanRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_request(&request)?;
    let plan = service.create_workout_plan(&user, &client_id, request.into()).await?;
    info!("Created workout plan {} for client {}", plan.id, client_id);
    Ok((StatusCode::CREATED, Json(plan)))
}

#[utoipa::path(
    get,
    path = "/api/v1/workout-plans/{plan_id}",
    params(("plan_id" = String, Path, description = "Workout plan ID")),
    responses(
        (status = 200, description = "Workout plan found", body = WorkoutPlan),
        (status = 404, description = "Workout plan not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "workout_plans"
)]
#[instrument(skip(service, user))]
pub async fn get_workout_plan(
    State(service): State<PlanService>,
    Extension(user): Extension<AuthUser>,
    Path(plan_id): Path<String>,
) -> ApiResult<Json<WorkoutPlan>> {
    Ok(Json(service.get_workout_plan(&user, &plan_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/workout-plans/{plan_id}",
    params(("plan_id" = String, Path, description = "Workout plan ID")),
    request_body = WorkoutPlanRequest,
    responses(
        (status = 200, description = "Workout plan replaced", body = WorkoutPlan),
        (status = 400, description = "Invalid plan", body = ErrorResponse),
        (status = 404, description = "Workout plan not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "workout_plans"
)]
#[instrument(skip(service, user, request))]
pub async fn update_workout_plan(
    State(service): State<PlanService>,
    Extension(user): Extension<AuthUser>,
    Path(plan_id): Path<String>,
    Json(request): Json<WorkoutPlanRequest>,
) -> ApiResult<Json<WorkoutPlan>> {
    validate_request(&request)?;
    Ok(Json(service.update_workout_plan(&user, &plan_id, request.into()).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/workout-plans/{plan_id}",
    params(("plan_id" = String, Path, description = "Workout plan ID")),
    responses(
        (status = 204, description = "Workout plan deleted"),
        (status = 404, description = "Workout plan not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "workout_plans"
)]
#[instrument(skip(service, user))]
pub async fn delete_workout_plan(
    State(service): State<PlanService>,
    Extension(user): Extension<AuthUser>,
    Path(plan_id): Path<String>,
) -> ApiResult<StatusCode> {
    service.delete_workout_plan(&user, &plan_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Make the plan the client's active workout plan
#[utoipa::path(
    post,
    path = "/api/v1/workout-plans/{plan_id}/activate",
    params(("plan_id" = String, Path, description = "Workout plan ID")),
    responses(
        (status = 200, description = "Workout plan activated", body = WorkoutPlan),
        (status = 404, description = "Workout plan not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "workout_plans"
)]
#[instrument(skip(service, user))]
pub async fn activate_workout_plan(
    State(service): State<PlanService>,
    Extension(user): Extension<AuthUser>,
    Path(plan_id): Path<String>,
) -> ApiResult<Json<WorkoutPlan>> {
    Ok(Json(service.activate_workout_plan(&user, &plan_id).await?))
}
