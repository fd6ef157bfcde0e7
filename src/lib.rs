pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod geo;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod validation;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::{build_router, AppState};
