use std::time::Duration;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::debug;

use fit_coach_domain::auth::auth_middleware;
use fit_coach_domain::auth::authorize::require_coach;

use crate::api::handlers::{
    auth, chat, check_ins, clients, habits, health, meal_plans, subscriptions, webhooks, workout_plans,
};
use crate::api::state::AppState;
use crate::openapi::configure_swagger_routes;

/// Create the application router
pub fn create_app(state: AppState) -> Router {
    debug!("Creating application router");

    // Coach-only routes; the role check runs after authentication
    let coach_routes = Router::new()
        .route("/clients", get(clients::list_clients).post(clients::create_client))
        .route("/habit-presets", get(habits::list_presets).post(habits::create_preset))
        .route("/habit-presets/:preset_id", delete(habits::delete_preset))
        .route_layer(middleware::from_fn(require_coach));

    // Routes open to coaches and clients; ownership is checked by the services
    let shared_routes = Router::new()
        .route("/clients/:client_id", get(clients::get_client))
        .route(
            "/clients/:client_id/meal-plans",
            get(meal_plans::list_meal_plans).post(meal_plans::create_meal_plan),
        )
        .route(
            "/meal-plans/:plan_id",
            get(meal_plans::get_meal_plan)
                .put(meal_plans::update_meal_plan)
                .delete(meal_plans::delete_meal_plan),
        )
        .route("/meal-plans/:plan_id/activate", post(meal_plans::activate_meal_plan))
        .route(
            "/clients/:client_id/workout-plans",
            get(workout_plans::list_workout_plans).post(workout_plans::create_workout_plan),
        )
        .route(
            "/workout-plans/:plan_id",
            get(workout_plans::get_workout_plan)
                .put(workout_plans::update_workout_plan)
                .delete(workout_plans::delete_workout_plan),
        )
        .route("/workout-plans/:plan_id/activate", post(workout_plans::activate_workout_plan))
        .route(
            "/clients/:client_id/habits",
            get(habits::list_habits).post(habits::assign_habit),
        )
        .route("/habits/:habit_id", put(habits::update_habit).delete(habits::archive_habit))
        .route(
            "/habits/:habit_id/completions/:date",
            post(habits::complete_habit).delete(habits::uncomplete_habit),
        )
        .route("/habits/:habit_id/progress", get(habits::weekly_progress))
        .route("/check-in-forms", get(check_ins::list_forms).post(check_ins::create_form))
        .route(
            "/clients/:client_id/check-ins",
            get(check_ins::list_check_ins).post(check_ins::create_check_in),
        )
        .route(
            "/clients/:client_id/subscription",
            get(subscriptions::get_subscription).post(subscriptions::subscribe),
        )
        .route("/clients/:client_id/subscription/cancel", post(subscriptions::cancel_subscription))
        .route("/clients/:client_id/subscription/resume", post(subscriptions::resume_subscription))
        .route("/clients/:client_id/subscription/refresh", post(subscriptions::refresh_subscription))
        .route(
            "/clients/:client_id/subscription/payment-method",
            put(subscriptions::update_payment_method),
        )
        .route(
            "/clients/:client_id/subscription/payment-methods",
            get(subscriptions::list_payment_methods),
        )
        .route("/clients/:client_id/subscription/invoices", get(subscriptions::list_invoices))
        .route(
            "/conversations/:user_id/messages",
            get(chat::get_conversation).post(chat::send_message),
        )
        .route("/messages/unread", get(chat::unread_messages));

    let api_routes = Router::new()
        .merge(coach_routes)
        .merge(shared_routes)
        .route_layer(middleware::from_fn_with_state(state.tokens.clone(), auth_middleware));

    debug!("API routes configured");

    let auth_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route_layer(middleware::from_fn_with_state(state.tokens.clone(), auth_middleware));

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/webhooks/stripe", post(webhooks::stripe_webhook));

    debug!("Public and auth routes configured");

    let app = Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .nest("/api/v1", api_routes)
        .with_state(state)
        .merge(configure_swagger_routes())
        .layer(TraceLayer::new_for_http());

    debug!("Swagger UI merged");

    configure_security(app)
}

/// CORS plus the security headers every response carries
pub fn configure_security(app: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    let security_headers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=63072000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
        ));

    app.layer(cors).layer(security_headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use fit_coach_data::database::create_in_memory_pool;
    use fit_coach_domain::auth::token::{TokenConfig, TokenService};
    use fit_coach_domain::billing::stripe::StripeClient;

    fn test_app() -> Router {
        let pool = create_in_memory_pool().unwrap();
        let tokens = Arc::new(TokenService::new(TokenConfig::new("test-secret", "fit-coach-test")));
        let gateway = Arc::new(StripeClient::new(None, None).unwrap());
        create_app(AppState::new(&pool, tokens, gateway, None, "development"))
    }

    #[tokio::test]
    async fn test_health_is_public_and_has_security_headers() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn test_api_requires_token() {
        let response = test_app()
            .oneshot(Request::builder().uri("/api/v1/messages/unread").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = test_app()
            .oneshot(Request::builder().uri("/api/v1/nothing-here").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
