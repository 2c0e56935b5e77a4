//! Moderation endpoints. [`AdminUser`] rejects non-admins before any of
//! these run.

use axum::{extract::State, Json};
use domains::models::UserProfile;

use super::{message, Message};
use crate::error::ApiError;
use crate::extractors::{AdminUser, PathId};
use crate::state::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    Ok(Json(state.admin.list_users(&admin).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    PathId(id): PathId,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.admin.get_user(&admin, id).await?))
}

pub async fn ban_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    PathId(id): PathId,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.admin.ban_user(&admin, id).await?))
}

pub async fn delete_problem(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    PathId(id): PathId,
) -> Result<Json<Message>, ApiError> {
    state.admin.delete_problem(&admin, id).await?;
    Ok(message("Problem deleted"))
}

pub async fn delete_solution(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    PathId(id): PathId,
) -> Result<Json<Message>, ApiError> {
    state.admin.delete_solution(&admin, id).await?;
    Ok(message("Solution deleted"))
}
