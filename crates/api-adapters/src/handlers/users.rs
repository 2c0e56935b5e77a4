use axum::{extract::State, Json};
use domains::models::UserProfile;
use services::ProfileChanges;

use crate::error::ApiError;
use crate::extractors::{AuthUser, JsonBody};
use crate::state::AppState;

pub async fn profile(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.users.profile(&requester).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    JsonBody(changes): JsonBody<ProfileChanges>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.users.update_profile(&requester, changes).await?))
}
