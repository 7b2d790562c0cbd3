// Shared library for the events and organizations API: domain model,
// persistence, authentication and telemetry

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod services;
pub mod telemetry;
pub mod validation;
