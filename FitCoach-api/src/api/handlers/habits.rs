use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};

use fit_coach_domain::auth::AuthUser;
use fit_coach_domain::entities::{Habit, HabitCompletion, HabitPreset, WeeklyProgress};

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::handlers::validate_request;
use crate::api::state::HabitService;
use crate::entities::habits::{
    AssignHabitRequest, HabitListQuery, HabitPresetRequest, ProgressQuery, UpdateHabitRequest,
};

#[utoipa::path(
    get,
    path = "/api/v1/habit-presets",
    responses(
        (status = 200, description = "The caller's habit presets", body = [HabitPreset]),
        (status = 403, description = "Coaches only", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "habits"
)]
#[instrument(skip(service, user))]
pub async fn list_presets(
    State(service): State<HabitService>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<HabitPreset>>> {
    Ok(Json(service.list_presets(&user).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/habit-presets",
    request_body = HabitPresetRequest,
    responses(
        (status = 201, description = "Preset created", body = HabitPreset),
        (status = 400, description = "Invalid cadence or fields", body = ErrorResponse),
        (status = 403, description = "Coaches only", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "habits"
)]
#[instrument(skip(service, user, request))]
pub async fn create_preset(
    State(service): State<HabitService>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<HabitPresetRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_request(&request)?;
    let preset = service.create_preset(&user, request.into()).await?;
    Ok((StatusCode::CREATED, Json(preset)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/habit-presets/{preset_id}",
    params(("preset_id" = String, Path, description = "Habit preset ID")),
    responses(
        (status = 204, description = "Preset deleted"),
        (status = 404, description = "Preset not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "habits"
)]
#[instrument(skip(service, user))]
pub async fn delete_preset(
    State(service): State<HabitService>,
    Extension(user): Extension<AuthUser>,
    Path(preset_id): Path<String>,
) -> ApiResult<StatusCode> {
    service.delete_preset(&user, &preset_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/{client_id}/habits",
    params(
        ("client_id" = String, Path, description = "Client user ID"),
        HabitListQuery
    ),
    responses(
        (status = 200, description = "Habits of the client", body = [Habit]),
        (status = 403, description = "Not the client or their coach", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "habits"
)]
#[instrument(skip(service, user))]
pub async fn list_habits(
    State(service): State<HabitService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
    Query(query): Query<HabitListQuery>,
) -> ApiResult<Json<Vec<Habit>>> {
    Ok(Json(service.list_habits(&user, &client_id, query.include_archived).await?))
}

/// Assign a habit to a client, optionally from a preset
#[utoipa::path(
    post,
    path = "/api/v1/clients/{client_id}/habits",
    params(("client_id" = String, Path, description = "Client user ID")),
    request_body = AssignHabitRequest,
    responses(
        (status = 201, description = "Habit assigned", body = Habit),
        (status = 400, description = "Invalid cadence or fields", body = ErrorResponse),
        (status = 403, description = "Coaches only", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "habits"
)]
#[instrument(skip(service, user, request))]
pub async fn assign_habit(
    State(service): State<HabitService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
    Json(request): Json<AssignHabitRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_request(&request)?;
    let habit = service.assign_habit(&user, &client_id, request.into()).await?;
    info!("Assigned habit {} to client {}", habit.id, client_id);
    Ok((StatusCode::CREATED, Json(habit)))
}

#[utoipa::path(
    put,
    path = "/api/v1/habits/{habit_id}",
    params(("habit_id" = String, Path, description = "Habit ID")),
    request_body = UpdateHabitRequest,
    responses(
        (status = 200, description = "Habit updated", body = Habit),
        (status = 400, description = "Invalid cadence or fields", body = ErrorResponse),
        (status = 404, description = "Habit not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "habits"
)]
#[instrument(skip(service, user, request))]
pub async fn update_habit(
    State(service): State<HabitService>,
    Extension(user): Extension<AuthUser>,
    Path(habit_id): Path<String>,
    Json(request): Json<UpdateHabitRequest>,
) -> ApiResult<Json<Habit>> {
    validate_request(&request)?;
    Ok(Json(service.update_habit(&user, &habit_id, request.into()).await?))
}

/// Archive a habit. Its completions are kept.
#[utoipa::path(
    delete,
    path = "/api/v1/habits/{habit_id}",
    params(("habit_id" = String, Path, description = "Habit ID")),
    responses(
        (status = 204, description = "Habit archived"),
        (status = 404, description = "Habit not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "habits"
)]
#[instrument(skip(service, user))]
pub async fn archive_habit(
    State(service): State<HabitService>,
    Extension(user): Extension<AuthUser>,
    Path(habit_id): Path<String>,
) -> ApiResult<StatusCode> {
    service.archive_habit(&user, &habit_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark the habit done on a date. Repeating the call is harmless.
#[utoipa::path(
    post,
    path = "/api/v1/habits/{habit_id}/completions/{date}",
    params(
        ("habit_id" = String, Path, description = "Habit ID"),
        ("date" = String, Path, description = "Completion date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Habit completed", body = HabitCompletion),
        (status = 400, description = "Date not allowed by the cadence", body = ErrorResponse),
        (status = 404, description = "Habit not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "habits"
)]
#[instrument(skip(service, user))]
pub async fn complete_habit(
    State(service): State<HabitService>,
    Extension(user): Extension<AuthUser>,
    Path((habit_id, date)): Path<(String, NaiveDate)>,
) -> ApiResult<Json<HabitCompletion>> {
    Ok(Json(service.complete_habit(&user, &habit_id, date).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/habits/{habit_id}/completions/{date}",
    params(
        ("habit_id" = String, Path, description = "Habit ID"),
        ("date" = String, Path, description = "Completion date, YYYY-MM-DD")
    ),
    responses(
        (status = 204, description = "Completion removed"),
        (status = 404, description = "No completion on that date", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "habits"
)]
#[instrument(skip(service, user))]
pub async fn uncomplete_habit(
    State(service): State<HabitService>,
    Extension(user): Extension<AuthUser>,
    Path((habit_id, date)): Path<(String, NaiveDate)>,
) -> ApiResult<StatusCode> {
    service.uncomplete_habit(&user, &habit_id, date).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Completions against target for the ISO week containing `date`
#[utoipa::path(
    get,
    path = "/api/v1/habits/{habit_id}/progress",
    params(
        ("habit_id" = String, Path, description = "Habit ID"),
        ProgressQuery
    ),
    responses(
        (status = 200, description = "Weekly progress", body = WeeklyProgress),
        (status = 404, description = "Habit not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "habits"
)]
#[instrument(skip(service, user))]
pub async fn weekly_progress(
    State(service): State<HabitService>,
    Extension(user): Extension<AuthUser>,
    Path(habit_id): Path<String>,
    Query(query): Query<ProgressQuery>,
) -> ApiResult<Json<WeeklyProgress>> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(service.weekly_progress(&user, &habit_id, date).await?))
}
