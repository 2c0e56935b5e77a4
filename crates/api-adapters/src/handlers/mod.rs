//! Request handlers, one module per API area.

pub mod admin;
pub mod auth;
pub mod problems;
pub mod solutions;
pub mod users;

use serde::Serialize;

/// `{"message": ...}` confirmation body.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

pub(crate) fn message(message: &'static str) -> axum::Json<Message> {
    axum::Json(Message { message })
}

pub async fn health() -> &'static str {
    "api is working"
}
