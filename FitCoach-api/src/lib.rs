// FitCoach-api lib.rs
//
// HTTP layer of the FitCoach application: routes, handlers, public
// request types, OpenAPI documentation and configuration.

pub mod api;
pub mod config;
pub mod entities;
pub mod openapi;

pub use api::{create_app, AppState};
