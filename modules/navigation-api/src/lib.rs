//! Admin HTTP surface over the navigation configuration.

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::{build_router, AppState};
