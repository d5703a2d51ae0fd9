use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use tracing::instrument;

use fit_coach_domain::auth::AuthUser;
use fit_coach_domain::entities::{Message, PageRequest, UnreadSummary};

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::handlers::validate_request;
use crate::api::state::ChatService;
use crate::entities::chat::{ConversationQuery, SendMessageRequest};
use crate::entities::common::{MessagePage, PaginatedResponse, PaginationParams};

/// Messages exchanged with another user, newest first
#[utoipa::path(
    get,
    path = "/api/v1/conversations/{user_id}/messages",
    params(
        ("user_id" = String, Path, description = "The other participant"),
        ConversationQuery
    ),
    responses(
        (status = 200, description = "Page of messages", body = MessagePage),
        (status = 403, description = "Not a coach and their client", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "chat"
)]
#[instrument(skip(service, user))]
pub async fn get_conversation(
    State(service): State<ChatService>,
    Extension(user): Extension<AuthUser>,
    Path(other_id): Path<String>,
    Query(query): Query<ConversationQuery>,
) -> ApiResult<Json<PaginatedResponse<Message>>> {
    let page: PageRequest = PaginationParams { limit: query.limit, offset: query.offset }.into();
    let messages = service.conversation(&user, &other_id, page, query.mark_read).await?;
    let base_path = format!("/api/v1/conversations/{}/messages", other_id);
    Ok(Json(PaginatedResponse::from_page(messages, &base_path)))
}

#[utoipa::path(
    post,
    path = "/api/v1/conversations/{user_id}/messages",
    params(("user_id" = String, Path, description = "Recipient")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = Message),
        (status = 400, description = "Empty or oversized message", body = ErrorResponse),
        (status = 403, description = "Not a coach and their client", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "chat"
)]
#[instrument(skip(service, user, request))]
pub async fn send_message(
    State(service): State<ChatService>,
    Extension(user): Extension<AuthUser>,
    Path(recipient_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_request(&request)?;
    let message = service.send_message(&user, &recipient_id, &request.body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Unread message counts for the caller, by sender
#[utoipa::path(
    get,
    path = "/api/v1/messages/unread",
    responses(
        (status = 200, description = "Unread counts", body = UnreadSummary),
    ),
    security(("bearer" = [])),
    tag = "chat"
)]
#[instrument(skip(service, user))]
pub async fn unread_messages(
    State(service): State<ChatService>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<UnreadSummary>> {
    Ok(Json(service.unread(&user).await?))
}
