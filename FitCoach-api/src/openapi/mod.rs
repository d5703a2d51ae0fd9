use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

/// Registers the `bearer` scheme referenced by protected paths
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health::health_check,

        crate::api::handlers::auth::register,
        crate::api::handlers::auth::login,
        crate::api::handlers::auth::refresh,
        crate::api::handlers::auth::logout,
        crate::api::handlers::auth::me,

        crate::api::handlers::clients::list_clients,
        crate::api::handlers::clients::create_client,
        crate::api::handlers::clients::get_client,

        crate::api::handlers::meal_plans::list_meal_plans,
        crate::api::handlers::meal_plans::create_meal_plan,
        crate::api::handlers::meal_plans::get_meal_plan,
        crate::api::handlers::meal_plans::update_meal_plan,
        crate::api::handlers::meal_plans::delete_meal_plan,
        crate::api::handlers::meal_plans::activate_meal_plan,

        crate::api::handlers::workout_plans::list_workout_plans,
        crate::api::handlers::workout_plans::create_workout_plan,
        crate::api::handlers::workout_plans::get_workout_plan,
        crate::api::handlers::workout_plans::update_workout_plan,
        crate::api::handlers::workout_plans::delete_workout_plan,
        crate::api::handlers::workout_plans::activate_workout_plan,

        crate::api::handlers::habits::list_presets,
        crate::api::handlers::habits::create_preset,
        crate::api::handlers::habits::delete_preset,
        crate::api::handlers::habits::list_habits,
        crate::api::handlers::habits::assign_habit,
        crate::api::handlers::habits::update_habit,
        crate::api::handlers::habits::archive_habit,
        crate::api::handlers::habits::complete_habit,
        crate::api::handlers::habits::uncomplete_habit,
        crate::api::handlers::habits::weekly_progress,

        crate::api::handlers::check_ins::list_forms,
        crate::api::handlers::check_ins::create_form,
        crate::api::handlers::check_ins::list_check_ins,
        crate::api::handlers::check_ins::create_check_in,

        crate::api::handlers::subscriptions::get_subscription,
        crate::api::handlers::subscriptions::subscribe,
        crate::api::handlers::subscriptions::cancel_subscription,
        crate::api::handlers::subscriptions::resume_subscription,
        crate::api::handlers::subscriptions::refresh_subscription,
        crate::api::handlers::subscriptions::update_payment_method,
        crate::api::handlers::subscriptions::list_payment_methods,
        crate::api::handlers::subscriptions::list_invoices,
        crate::api::handlers::webhooks::stripe_webhook,

        crate::api::handlers::chat::get_conversation,
        crate::api::handlers::chat::send_message,
        crate::api::handlers::chat::unread_messages,
    ),
    components(
        schemas(
            // Request bodies
            crate::entities::auth::RegistrationRequest,
            crate::entities::auth::LoginRequest,
            crate::entities::auth::RefreshRequest,
            crate::entities::clients::CreateClientRequest,
            crate::entities::plans::MealPlanRequest,
            crate::entities::plans::MealPlanResponse,
            crate::entities::plans::WorkoutPlanRequest,
            crate::entities::habits::HabitPresetRequest,
            crate::entities::habits::AssignHabitRequest,
            crate::entities::habits::UpdateHabitRequest,
            crate::entities::check_ins::CheckInFormRequest,
            crate::entities::check_ins::CheckInRequest,
            crate::entities::subscriptions::SubscribeRequest,
            crate::entities::subscriptions::PaymentMethodRequest,
            crate::entities::subscriptions::WebhookResponse,
            crate::entities::chat::SendMessageRequest,
            crate::entities::common::CheckInPage,
            crate::entities::common::MessagePage,
            crate::api::error::ErrorResponse,
            crate::api::handlers::health::HealthResponse,
            crate::api::handlers::health::ComponentHealthStatus,

            // Domain records
            fit_coach_domain::auth::token::TokenPair,
            fit_coach_domain::entities::AuthSession,
            fit_coach_domain::entities::Role,
            fit_coach_domain::entities::User,
            fit_coach_domain::entities::ClientOverview,
            fit_coach_domain::entities::FoodItem,
            fit_coach_domain::entities::Meal,
            fit_coach_domain::entities::MacroTotals,
            fit_coach_domain::entities::meal_plan::PlanTotals,
            fit_coach_domain::entities::MealPlan,
            fit_coach_domain::entities::Exercise,
            fit_coach_domain::entities::WorkoutDay,
            fit_coach_domain::entities::WorkoutPlan,
            fit_coach_domain::entities::DayOfWeek,
            fit_coach_domain::entities::Frequency,
            fit_coach_domain::entities::CadenceSpec,
            fit_coach_domain::entities::HabitPreset,
            fit_coach_domain::entities::Habit,
            fit_coach_domain::entities::HabitCompletion,
            fit_coach_domain::entities::WeeklyProgress,
            fit_coach_domain::entities::CheckInKind,
            fit_coach_domain::entities::CheckInForm,
            fit_coach_domain::entities::CheckInResponse,
            fit_coach_domain::entities::CheckIn,
            fit_coach_domain::entities::Subscription,
            fit_coach_domain::entities::SubscriptionOverview,
            fit_coach_domain::billing::retry::RetryEstimate,
            fit_coach_domain::billing::retry::RetrySource,
            fit_coach_domain::billing::BillingInvoice,
            fit_coach_domain::billing::PaymentMethodSummary,
            fit_coach_domain::entities::Message,
            fit_coach_domain::entities::SenderUnread,
            fit_coach_domain::entities::UnreadSummary,
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "auth", description = "Registration, sign-in and tokens"),
        (name = "clients", description = "A coach's clients"),
        (name = "meal_plans", description = "Meal plans with macro totals"),
        (name = "workout_plans", description = "Workout plans"),
        (name = "habits", description = "Habit presets, assignments and completions"),
        (name = "check_ins", description = "Check-in forms and submissions"),
        (name = "subscriptions", description = "Client subscriptions and billing events"),
        (name = "chat", description = "Messages between a coach and their clients")
    ),
    info(
        title = "FitCoach API",
        version = "0.1.0",
        description = "API for coaches managing clients, plans, habits, check-ins and subscriptions",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;
