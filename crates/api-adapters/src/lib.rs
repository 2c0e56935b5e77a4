//! # api-adapters
//!
//! The axum HTTP surface of civic-board: JSON routes under `/api`, bearer
//! authentication extractors and the error-to-response mapping.

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extractors;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod routes;
#[cfg(feature = "web-axum")]
pub mod state;

#[cfg(feature = "web-axum")]
pub use error::ApiError;
#[cfg(feature = "web-axum")]
pub use routes::{router, RouterOptions};
#[cfg(feature = "web-axum")]
pub use state::{AppState, Ports};
