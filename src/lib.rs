#![doc = "The `fieldtask` library crate."]
#![doc = ""]
#![doc = "Domain models, persistence, authentication, availability accounting, uploads"]
#![doc = "and routing for the FieldTask API. The binary (`main.rs`) wires these into an"]
#![doc = "`HttpServer`; the integration tests wire them into `actix_web::test` services."]

pub mod auth;
pub mod availability;
pub mod config;
pub mod error;
pub mod mail;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod uploads;

pub use crate::error::AppError;
pub use crate::state::AppState;
