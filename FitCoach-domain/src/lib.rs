// FitCoach Domain
// Business rules, services, authentication and the billing integration

// Services that implement business logic
pub mod services;

// Authentication and authorization
pub mod auth;

// Billing provider integration
pub mod billing;

// Domain entities
pub mod entities;

// Health checks and system status
pub mod health;

// Re-export the database module from the data crate for convenience
pub use fit_coach_data::database;

// Testing utilities - only available with mock feature
#[cfg(feature = "mock")]
pub mod testing;
