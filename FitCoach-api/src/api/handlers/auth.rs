use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use tracing::{info, instrument};

use fit_coach_domain::auth::token::TokenPair;
use fit_coach_domain::auth::AuthUser;
use fit_coach_domain::entities::{AuthSession, User};

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::handlers::validate_request;
use crate::api::state::AccountService;
use crate::entities::auth::{LoginRequest, RefreshRequest, RegistrationRequest};

/// Register a coach account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegistrationRequest,
    responses(
        (status = 201, description = "Coach registered and signed in", body = AuthSession),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(service, request))]
pub async fn register(
    State(service): State<AccountService>,
    Json(request): Json<RegistrationRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_request(&request)?;
    let session = service.register_coach(request.into()).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthSession),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(service, request))]
pub async fn login(
    State(service): State<AccountService>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthSession>> {
    validate_request(&request)?;
    Ok(Json(service.login(request.into()).await?))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Refresh token invalid, expired or revoked", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(service, request))]
pub async fn refresh(
    State(service): State<AccountService>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<Json<TokenPair>> {
    validate_request(&request)?;
    Ok(Json(service.refresh(&request.refresh_token).await?))
}

/// Revoke every token issued to the caller
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip(service, user))]
pub async fn logout(
    State(service): State<AccountService>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<StatusCode> {
    service.logout(&user.user_id).await?;
    info!("User {} signed out", user.user_id);
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in user
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip(service, user))]
pub async fn me(
    State(service): State<AccountService>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<User>> {
    Ok(Json(service.me(&user.user_id).await?))
}
