use axum::{extract::State, http::StatusCode, Json};
use domains::models::{Comment, Problem, ProblemView};
use domains::votes::VoteDirection;
use serde::Deserialize;
use services::{NewProblem, ProblemChanges};

use super::{message, Message};
use crate::error::ApiError;
use crate::extractors::{AuthUser, JsonBody, PathId, ProblemForm};
use crate::state::AppState;

/// Body of a comment request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentBody {
    pub text: String,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ProblemView>>, ApiError> {
    Ok(Json(state.problems.list().await?))
}

pub async fn list_mine(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
) -> Result<Json<Vec<ProblemView>>, ApiError> {
    Ok(Json(state.problems.list_mine(&requester).await?))
}

pub async fn get(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> Result<Json<ProblemView>, ApiError> {
    Ok(Json(state.problems.get(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    form: ProblemForm,
) -> Result<(StatusCode, Json<Problem>), ApiError> {
    let input = NewProblem {
        location: form.location.unwrap_or_default(),
        description: form.description.unwrap_or_default(),
        image: form.image,
    };
    let problem = state.problems.create(&requester, input).await?;
    Ok((StatusCode::CREATED, Json(problem)))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    PathId(id): PathId,
    form: ProblemForm,
) -> Result<Json<Problem>, ApiError> {
    let changes = ProblemChanges {
        location: form.location,
        description: form.description,
        image: form.image,
    };
    Ok(Json(state.problems.update(id, &requester, changes).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    PathId(id): PathId,
) -> Result<Json<Message>, ApiError> {
    state.problems.delete(id, &requester).await?;
    Ok(message("Problem deleted"))
}

pub async fn upvote(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    PathId(id): PathId,
) -> Result<Json<Problem>, ApiError> {
    Ok(Json(state.problems.vote(id, &requester, VoteDirection::Up).await?))
}

pub async fn downvote(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    PathId(id): PathId,
) -> Result<Json<Problem>, ApiError> {
    Ok(Json(state.problems.vote(id, &requester, VoteDirection::Down).await?))
}

pub async fn comment(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    PathId(id): PathId,
    JsonBody(body): JsonBody<CommentBody>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let comment = state.problems.comment(id, &requester, &body.text).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
