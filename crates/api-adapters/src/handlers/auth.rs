use axum::{extract::State, http::StatusCode, Json};
use services::{AuthResponse, LoginInput, SignupInput};

use crate::error::ApiError;
use crate::extractors::JsonBody;
use crate::state::AppState;

pub async fn signup(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SignupInput>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let session = state.auth.signup(input).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<LoginInput>,
) -> Result<Json<AuthResponse>, ApiError> {
    Ok(Json(state.auth.login(input).await?))
}
