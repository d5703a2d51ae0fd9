// FitCoach Data
// This crate owns the SQLite schema and the repositories over it

// Database connection management
pub mod database;

// Repository implementations for data access
pub mod repository;

// Data storage models
pub mod models;
