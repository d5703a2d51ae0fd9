use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use tracing::{info, instrument};

use fit_coach_domain::auth::AuthUser;
use fit_coach_domain::entities::{ClientOverview, User};

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::handlers::validate_request;
use crate::api::state::ClientService;
use crate::entities::clients::CreateClientRequest;

/// Dashboard overview of the caller's clients
#[utoipa::path(
    get,
    path = "/api/v1/clients",
    responses(
        (status = 200, description = "Client overviews", body = [ClientOverview]),
        (status = 403, description = "Coaches only", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "clients"
)]
#[instrument(skip(service, user))]
pub async fn list_clients(
    State(service): State<ClientService>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<ClientOverview>>> {
    Ok(Json(service.list_clients(&user).await?))
}

/// Add a client account
#[utoipa::path(
    post,
    path = "/api/v1/clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = User),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "clients"
)]
#[instrument(skip(service, user, request))]
pub async fn create_client(
    State(service): State<ClientService>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateClientRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_request(&request)?;
    let client = service.create_client(&user, request.into()).await?;
    info!("Coach {} added client {}", user.user_id, client.id);
    Ok((StatusCode::CREATED, Json(client)))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/{client_id}",
    params(("client_id" = String, Path, description = "Client user ID")),
    responses(
        (status = 200, description = "Client found", body = User),
        (status = 403, description = "Not the client or their coach", body = ErrorResponse),
        (status = 404, description = "Client not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "clients"
)]
#[instrument(skip(service, user))]
pub async fn get_client(
    State(service): State<ClientService>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
) -> ApiResult<Json<User>> {
    Ok(Json(service.get_client(&user, &client_id).await?))
}
