use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::auth::logging::{log_access_denied, log_auth_event, AuthEvent, AuthEventType};
use crate::auth::AuthUser;
use crate::entities::Role;

/// Reject authenticated users without `role` with a 403.
///
/// Must run after `auth_middleware`.
pub async fn require_role(role: Role, req: Request<Body>, next: Next) -> Response {
    let request_path = req.uri().path().to_string();

    match req.extensions().get::<AuthUser>() {
        Some(user) if user.role == role => next.run(req).await,
        Some(user) => {
            warn!("User {} lacks role {} for {}", user.user_id, role, request_path);
            log_access_denied(&user.user_id, &request_path, role.as_str());
            (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "forbidden",
                    "message": "You don't have the required permissions to access this resource",
                    "required_role": role.as_str(),
                })),
            )
                .into_response()
        }
        None => {
            warn!("No user found in request extensions for path: {}", request_path);
            let event = AuthEvent::new(AuthEventType::AccessDenied, None, false)
                .with_details("Authentication context missing in request extensions")
                .with_resource(request_path)
                .with_auth_method("role");
            log_auth_event(event);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "Authentication context missing",
                })),
            )
                .into_response()
        }
    }
}

/// `require_role(Role::Coach, ..)` in a form `middleware::from_fn` accepts
pub async fn require_coach(req: Request<Body>, next: Next) -> Response {
    require_role(Role::Coach, req, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(user: Option<AuthUser>) -> Router {
        Router::new()
            .route("/coach-only", get(|| async { "ok" }))
            .layer(middleware::from_fn(require_coach))
            .layer(middleware::from_fn(move |mut req: Request<Body>, next: Next| {
                let user = user.clone();
                async move {
                    if let Some(user) = user {
                        req.extensions_mut().insert(user);
                    }
                    next.run(req).await
                }
            }))
    }

    async fn status_for(user: Option<AuthUser>) -> StatusCode {
        app(user)
            .oneshot(Request::builder().uri("/coach-only").body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_coach_is_allowed() {
        let coach = AuthUser { user_id: "c1".to_string(), role: Role::Coach };
        assert_eq!(status_for(Some(coach)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_client_is_forbidden() {
        let client = AuthUser { user_id: "u1".to_string(), role: Role::Client };
        assert_eq!(status_for(Some(client)).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_context_is_server_error() {
        assert_eq!(status_for(None).await, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
