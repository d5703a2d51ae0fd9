//! Authentication for the FitCoach API
//!
//! Bearer JWT validation middleware, role guard, password hashing and
//! structured auth event logging.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::entities::Role;
use crate::auth::logging::{log_auth_event, AuthEvent, AuthEventType};
use crate::auth::token::{SecurityError, TokenService, TokenType};

pub mod authorize;
pub mod logging;
pub mod password;
pub mod revocation;
pub mod token;

/// Where browsers are sent when they are not signed in
pub const LOGIN_PATH: &str = "/login";

/// Identity attached to authenticated requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_coach(&self) -> bool {
        self.role == Role::Coach
    }
}

/// Whether the caller is a browser asking for a page rather than an API client
pub fn prefers_html(headers: &HeaderMap) -> bool {
    let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    match (accept.find("text/html"), accept.find("application/json")) {
        (Some(html), Some(json)) => html < json,
        (Some(_), None) => true,
        _ => false,
    }
}

/// 401 for API clients, 303 to the login page for browsers
pub fn unauthorized_response(wants_html: bool, message: &str) -> Response {
    if wants_html {
        return Redirect::to(LOGIN_PATH).into_response();
    }
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message,
        })),
    )
        .into_response()
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err("Authorization header does not contain Bearer token"),
    }
}

/// Authentication middleware for protected routes
pub async fn auth_middleware(
    State(tokens): State<Arc<TokenService>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let request_path = req.uri().path().to_string();
    let start_time = Instant::now();
    let wants_html = prefers_html(req.headers());

    let token = match bearer_token(req.headers()) {
        Ok(token) => token.to_string(),
        Err(reason) => {
            debug!("{} for {}", reason, request_path);
            let event = AuthEvent::new(AuthEventType::TokenValidation, None, false)
                .with_details(reason)
                .with_resource(request_path)
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("jwt");
            log_auth_event(event);
            return unauthorized_response(wants_html, reason);
        }
    };

    match tokens.validate(&token, TokenType::Access) {
        Ok(claims) => {
            let event = AuthEvent::new(AuthEventType::TokenValidation, Some(&claims.sub), true)
                .with_resource(request_path)
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("jwt");
            log_auth_event(event);

            req.extensions_mut().insert(AuthUser {
                user_id: claims.sub,
                role: claims.role,
            });
            next.run(req).await
        }
        Err(e) => {
            let message = match e {
                SecurityError::TokenExpired => "Token has expired",
                SecurityError::TokenRevoked => "Token has been revoked",
                _ => "Invalid token",
            };
            let event = AuthEvent::new(AuthEventType::TokenValidation, None, false)
                .with_details(e.to_string())
                .with_resource(request_path)
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("jwt");
            log_auth_event(event);
            unauthorized_response(wants_html, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    use crate::auth::token::TokenConfig;

    fn app(tokens: Arc<TokenService>) -> Router {
        Router::new()
            .route("/private", get(|Extension(user): Extension<AuthUser>| async move { user.user_id }))
            .layer(middleware::from_fn_with_state(tokens, auth_middleware))
    }

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new(TokenConfig::new("middleware-test-secret", "test")))
    }

    #[test]
    fn test_prefers_html() {
        let mut headers = HeaderMap::new();
        assert!(!prefers_html(&headers));

        headers.insert(header::ACCEPT, "text/html,application/xhtml+xml".parse().unwrap());
        assert!(prefers_html(&headers));

        headers.insert(header::ACCEPT, "application/json, text/html".parse().unwrap());
        assert!(!prefers_html(&headers));
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let tokens = tokens();
        let token = tokens.issue("user-1", Role::Coach, TokenType::Access).unwrap();

        let response = app(tokens)
            .oneshot(
                Request::builder()
                    .uri("/private")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_token_is_401_for_api_clients() {
        let response = app(tokens())
            .oneshot(Request::builder().uri("/private").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_browser_is_redirected_to_login() {
        let response = app(tokens())
            .oneshot(
                Request::builder()
                    .uri("/private")
                    .header(header::ACCEPT, "text/html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), LOGIN_PATH);
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_accepted() {
        let tokens = tokens();
        let token = tokens.issue("user-1", Role::Client, TokenType::Refresh).unwrap();

        let response = app(tokens)
            .oneshot(
                Request::builder()
                    .uri("/private")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
