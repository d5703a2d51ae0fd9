// Public request and response types for the FitCoach API.
// Domain entities are returned directly where their shape is already public.

// Pagination and shared query parameters
pub mod common;

// Accounts and tokens
pub mod auth;

// Coaching resources
pub mod clients;
pub mod plans;
pub mod habits;
pub mod check_ins;
pub mod subscriptions;
pub mod chat;
