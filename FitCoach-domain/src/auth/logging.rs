use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// Types of authentication events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthEventType {
    /// Password login
    Login,
    /// Failed login attempt
    FailedLogin,
    /// Coach self-registration
    Registration,
    /// Logout, which revokes issued tokens
    Logout,
    /// Refresh token exchanged for a new pair
    TokenRefresh,
    /// Bearer token checked by the middleware
    TokenValidation,
    /// Authenticated but not allowed
    AccessDenied,
}

impl std::fmt::Display for AuthEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthEventType::Login => write!(f, "LOGIN"),
            AuthEventType::FailedLogin => write!(f, "FAILED_LOGIN"),
            AuthEventType::Registration => write!(f, "REGISTRATION"),
            AuthEventType::Logout => write!(f, "LOGOUT"),
            AuthEventType::TokenRefresh => write!(f, "TOKEN_REFRESH"),
            AuthEventType::TokenValidation => write!(f, "TOKEN_VALIDATION"),
            AuthEventType::AccessDenied => write!(f, "ACCESS_DENIED"),
        }
    }
}

/// Authentication event record
#[derive(Debug, Clone, Serialize)]
pub struct AuthEvent {
    pub event_type: AuthEventType,
    /// User ID or attempted email, when known
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub details: Option<String>,
    /// Request path, when the event belongs to a request
    pub resource: Option<String>,
    pub duration_ms: Option<u64>,
    /// "password", "jwt", "refresh_token" or "role"
    pub auth_method: Option<String>,
}

impl AuthEvent {
    pub fn new(event_type: AuthEventType, user_id: Option<&str>, success: bool) -> Self {
        Self {
            event_type,
            user_id: user_id.map(String::from),
            timestamp: Utc::now(),
            success,
            details: None,
            resource: None,
            duration_ms: None,
            auth_method: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_auth_method(mut self, auth_method: impl Into<String>) -> Self {
        self.auth_method = Some(auth_method.into());
        self
    }
}

/// Log an authentication event. Failures are logged at warn level.
pub fn log_auth_event(event: AuthEvent) {
    let user_id = event.user_id.as_deref().unwrap_or("anonymous");
    let details = event.details.as_deref().unwrap_or("");
    let resource = event.resource.as_deref().unwrap_or("-");

    if event.success {
        info!(
            "AUTH-LOG [{}] [{}] [SUCCESS] [{}] {}",
            event.event_type, user_id, resource, details
        );
    } else {
        warn!(
            "AUTH-LOG [{}] [{}] [FAILURE] [{}] {}",
            event.event_type, user_id, resource, details
        );
    }
}

pub fn log_successful_login(user_id: &str) {
    log_auth_event(AuthEvent::new(AuthEventType::Login, Some(user_id), true).with_auth_method("password"));
}

pub fn log_failed_login(email: &str, reason: &str) {
    let event = AuthEvent::new(AuthEventType::FailedLogin, Some(email), false)
        .with_details(reason)
        .with_auth_method("password");
    log_auth_event(event);
}

pub fn log_registration(user_id: &str) {
    log_auth_event(AuthEvent::new(AuthEventType::Registration, Some(user_id), true));
}

pub fn log_token_refresh(user_id: Option<&str>, success: bool, details: Option<&str>) {
    let mut event = AuthEvent::new(AuthEventType::TokenRefresh, user_id, success)
        .with_auth_method("refresh_token");
    if let Some(d) = details {
        event = event.with_details(d);
    }
    log_auth_event(event);
}

pub fn log_logout(user_id: &str) {
    log_auth_event(AuthEvent::new(AuthEventType::Logout, Some(user_id), true));
}

pub fn log_access_denied(user_id: &str, resource: &str, required_role: &str) {
    let event = AuthEvent::new(AuthEventType::AccessDenied, Some(user_id), false)
        .with_resource(resource)
        .with_details(format!("Required role: {}", required_role))
        .with_auth_method("role");
    log_auth_event(event);
}
