use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use tracing::instrument;

use fit_coach_domain::auth::AuthUser;
use fit_coach_domain::entities::{CheckIn, CheckInForm};

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::handlers::validate_request;
use crate::api::state::CheckInService;
use crate::entities::check_ins::{CheckInFormRequest, CheckInRequest};
use crate::entities::common::{CheckInPage, PaginatedResponse, PaginationParams};

/// Forms of the coach, or of the client's coach
#[utoipa::path(
    get,
    path = "/api/v1/check-in-forms",
    responses(
        (status = 200, description = "Check-in forms", body = [CheckInForm]),
    ),
    security(("bearer" = [])),
    tag = "check_ins"
)]
#[instrument(skip(service, user))]
pub async fn list_forms(
    State(service): State<CheckInService>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<CheckInForm>>> {
    Ok(Json(service.list_forms(&user).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/check-in-forms",
    request_body = CheckInFormRequest,
    responses(
        (status = 201, description = "Form created", body = CheckInForm),
        (status = 400, description = "Invalid form", body = ErrorResponse),
        (status = 403, description = "Coaches only", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "check_ins"
)]
#[instrument(skip(service, user, request))]
pub async fn create_form(
    State(service): State<CheckInService>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CheckInFormRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_request(&request)?;
    let form = service.create_form(&user, request.into()).await?;
    Ok((StatusCode::CREATED, Json(form)))
}

/// Check-ins of a client, newest first
#[utoipa::path(
    get,
    path = "/api/v1/clients/{client_id}/check-ins",
    params(
        ("client_id" = String, Path, description = "Client user ID"),
        PaginationParams
    ),
    responses(
        (status = 200, description = "Page of check-ins", body = CheckInPage),
        (status = 403, description = "Not the client or their coach", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "check_ins"
)]
#[instrument(skip(service, user))]
pub async fn list_check_ins(
    State(service): State<CheckInService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<PaginatedResponse<CheckIn>>> {
    let page = service.list_check_ins(&user, &client_id, params.into()).await?;
    let base_path = format!("/api/v1/clients/{}/check-ins", client_id);
    Ok(Json(PaginatedResponse::from_page(page, &base_path)))
}

/// Submit (client) or log (coach) a check-in
#[utoipa::path(
    post,
    path = "/api/v1/clients/{client_id}/check-ins",
    params(("client_id" = String, Path, description = "Client user ID")),
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Check-in recorded", body = CheckIn),
        (status = 400, description = "Invalid check-in", body = ErrorResponse),
        (status = 403, description = "Not the client or their coach", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "check_ins"
)]
#[instrument(skip(service, user, request))]
pub async fn create_check_in(
    State(service): State<CheckInService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
    Json(request): Json<CheckInRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_request(&request)?;
    let check_in = service.create_check_in(&user, &client_id, request.into()).await?;
    Ok((StatusCode::CREATED, Json(check_in)))
}
