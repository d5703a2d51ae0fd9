use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use tracing::{info, instrument};

use fit_coach_domain::auth::AuthUser;

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::handlers::validate_request;
use crate::api::state::PlanService;
use crate::entities::plans::{MealPlanRequest, MealPlanResponse};

#[utoipa::path(
    get,
    path = "/api/v1/clients/{client_id}/meal-plans",
    params(("client_id" = String, Path, description = "Client user ID")),
    responses(
        (status = 200, description = "Meal plans of the client, newest first", body = [MealPlanResponse]),
        (status = 403, description = "Not the client or their coach", body = ErrorResponse),
        (status = 404, description = "Client not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "meal_plans"
)]
#[instrument(skip(service, user))]
pub async fn list_meal_plans(
    State(service): State<PlanService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
) -> ApiResult<Json<Vec<MealPlanResponse>>> {
    let plans = service.list_meal_plans(&user, &client_id).await?;
    Ok(Json(plans.into_iter().map(MealPlanResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/clients/{client_id}/meal-plans",
    params(("client_id" = String, Path, description = "Client user ID")),
    request_body = MealPlanRequest,
    responses(
        (status = 201, description = "Meal plan created", body = MealPlanResponse),
        (status = 400, description = "Invalid plan", body = ErrorResponse),
        (status = 403, description = "Coaches only", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "meal_plans"
)]
#[instrument(skip(service, user, request))]
pub async fn create_meal_plan(
    State(service): State<PlanService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
    Json(request): Json<MealPlanRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_request(&request)?;
    let plan = service.create_meal_plan(&user, &client_id, request.into()).await?;
    info!("Created meal plan {} for client {}", plan.id, client_id);
    Ok((StatusCode::CREATED, Json(MealPlanResponse::from(plan))))
}

#[utoipa::path(
    get,
    path = "/api/v1/meal-plans/{plan_id}",
    params(("plan_id" = String, Path, description = "Meal plan ID")),
    responses(
        (status = 200, description = "Meal plan found", body = MealPlanResponse),
        (status = 404, description = "Meal plan not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "meal_plans"
)]
#[instrument(skip(service, user))]
pub async fn get_meal_plan(
    State(service): State<PlanService>,
    Extension(user): Extension<AuthUser>,
    Path(plan_id): Path<String>,
) -> ApiResult<Json<MealPlanResponse>> {
    Ok(Json(service.get_meal_plan(&user, &plan_id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/api/v1/meal-plans/{plan_id}",
    params(("plan_id" = String, Path, description = "Meal plan ID")),
    request_body = MealPlanRequest,
    responses(
        (status = 200, description = "Meal plan replaced", body = MealPlanResponse),
        (status = 400, description = "Invalid plan", body = ErrorResponse),
        (status = 404, description = "Meal plan not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "meal_plans"
)]
#[instrument(skip(service, user, request))]
pub async fn update_meal_plan(
    State(service): State<PlanService>,
    Extension(user): Extension<AuthUser>,
    Path(plan_id): Path<String>,
    Json(request): Json<MealPlanRequest>,
) -> ApiResult<Json<MealPlanResponse>> {
    validate_request(&request)?;
    Ok(Json(service.update_meal_plan(&user, &plan_id, request.into()).await?.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/meal-plans/{plan_id}",
    params(("plan_id" = String, Path, description = "Meal plan ID")),
    responses(
        (status = 204, description = "Meal plan deleted"),
        (status = 404, description = "Meal plan not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "meal_plans"
)]
#[instrument(skip(service, user))]
pub async fn delete_meal_plan(
    State(service): State<PlanService>,
    Extension(user): Extension<AuthUser>,
    Path(plan_id): Path<String>,
) -> ApiResult<StatusCode> {
    service.delete_meal_plan(&user, &plan_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Make the plan the client's active meal plan
#[utoipa::path(
    post,
    path = "/api/v1/meal-plans/{plan_id}/activate",
    params(("plan_id" = String, Path, description = "Meal plan ID")),
    responses(
        (status = 200, description = "Meal plan activated", body = MealPlanResponse),
        (status = 404, description = "Meal plan not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "meal_plans"
)]
#[instrument(skip(service, user))]
pub async fn activate_meal_plan(
    State(service): State<PlanService>,
    Extension(user): Extension<AuthUser>,
    Path(plan_id): Path<String>,
) -> ApiResult<Json<MealPlanResponse>> {
    Ok(Json(service.activate_meal_plan(&user, &plan_id).await?.into()))
}
