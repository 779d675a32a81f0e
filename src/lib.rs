#![doc = "The `eventdesk` library crate."]
#![doc = ""]
#![doc = "Domain models, candidacy rules, authentication, routing configuration and"]
#![doc = "error handling for the event, candidacy and task coordination service."]
#![doc = "The binary (`main.rs`) builds the HTTP server from these pieces."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;

pub use crate::error::AppError;

/// Embedded schema migrations, applied at startup and by the integration tests.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
