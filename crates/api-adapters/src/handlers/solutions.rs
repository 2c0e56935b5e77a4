//! Solution routes share one `{id}` segment: it names the problem for
//! `GET`/`POST` and the solution for everything else.

use axum::{extract::State, http::StatusCode, Json};
use domains::models::{Comment, Solution, SolutionView};
use domains::votes::VoteDirection;
use serde::Deserialize;

use super::problems::CommentBody;
use super::{message, Message};
use crate::error::ApiError;
use crate::extractors::{AuthUser, JsonBody, PathId};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SuggestBody {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EditBody {
    pub text: Option<String>,
}

pub async fn list_for_problem(
    State(state): State<AppState>,
    PathId(problem_id): PathId,
) -> Result<Json<Vec<SolutionView>>, ApiError> {
    Ok(Json(state.solutions.list_for_problem(problem_id).await?))
}

pub async fn suggest(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    PathId(problem_id): PathId,
    JsonBody(body): JsonBody<SuggestBody>,
) -> Result<(StatusCode, Json<Solution>), ApiError> {
    let solution = state
        .solutions
        .suggest(problem_id, &requester, &body.text)
        .await?;
    Ok((StatusCode::CREATED, Json(solution)))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    PathId(id): PathId,
    JsonBody(body): JsonBody<EditBody>,
) -> Result<Json<Solution>, ApiError> {
    Ok(Json(
        state
            .solutions
            .update(id, &requester, body.text.as_deref())
            .await?,
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    PathId(id): PathId,
) -> Result<Json<Message>, ApiError> {
    state.solutions.delete(id, &requester).await?;
    Ok(message("Solution deleted"))
}

pub async fn upvote(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    PathId(id): PathId,
) -> Result<Json<Solution>, ApiError> {
    Ok(Json(state.solutions.vote(id, &requester, VoteDirection::Up).await?))
}

pub async fn downvote(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    PathId(id): PathId,
) -> Result<Json<Solution>, ApiError> {
    Ok(Json(state.solutions.vote(id, &requester, VoteDirection::Down).await?))
}

pub async fn comment(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    PathId(id): PathId,
    JsonBody(body): JsonBody<CommentBody>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let comment = state.solutions.comment(id, &requester, &body.text).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
