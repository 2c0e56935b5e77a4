//! Custom extractors
//!
//! Authentication, path ids and request bodies, each rejecting with the
//! API's JSON error shape instead of axum's plain-text defaults.

use axum::{
    extract::{
        multipart::MultipartError, rejection::JsonRejection, FromRef, FromRequest,
        FromRequestParts, Multipart, Path, Request,
    },
    http::{header, request::Parts, HeaderMap, StatusCode},
    Json,
};
use domains::errors::DomainError;
use domains::models::{Requester, Upload};
use domains::policy::require_admin;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

const NO_TOKEN: &str = "No token provided, authorization denied";

/// The token from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// A verified, existing, unbanned caller.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Requester);

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| DomainError::Unauthorized(NO_TOKEN.to_string()))?;

        let state = AppState::from_ref(state);
        let requester = state.auth.authenticate(token).await?;
        Ok(AuthUser(requester))
    }
}

/// An [`AuthUser`] holding the admin role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub Requester);

impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(requester) = AuthUser::from_request_parts(parts, state).await?;
        require_admin(&requester)?;
        Ok(AdminUser(requester))
    }
}

/// The single `{id}` segment of a route, parsed as a UUID.
#[derive(Debug, Clone, Copy)]
pub struct PathId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for PathId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::invalid_id())?;
        Uuid::parse_str(&raw)
            .map(PathId)
            .map_err(|_| ApiError::invalid_id())
    }
}

/// `Json<T>` with JSON error bodies.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    // Buffering failures (body over the limit, aborted upload) keep their status.
    if let JsonRejection::BytesRejection(err) = &rejection {
        return ApiError::Rejected {
            status: err.status(),
            message: err.body_text(),
        };
    }
    let message = match &rejection {
        JsonRejection::JsonDataError(err) => format!("Invalid JSON data: {}", err.body_text()),
        JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err.body_text()),
        JsonRejection::MissingJsonContentType(_) => {
            "Missing 'Content-Type: application/json' header".to_string()
        }
        _ => format!("Failed to parse JSON: {}", rejection.body_text()),
    };
    ApiError::bad_request(message)
}

/// Text fields of a problem, as sent in a JSON body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProblemFields {
    location: Option<String>,
    description: Option<String>,
}

/// Problem create/update payload: `multipart/form-data` with an optional
/// `image` file, or plain JSON without one.
#[derive(Debug, Default)]
pub struct ProblemForm {
    pub location: Option<String>,
    pub description: Option<String>,
    pub image: Option<Upload>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::Rejected {
        status: err.status(),
        message: err.body_text(),
    }
}

impl<S: Send + Sync> FromRequest<S> for ProblemForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let JsonBody(fields) = JsonBody::<ProblemFields>::from_request(req, state).await?;
            return Ok(ProblemForm {
                location: fields.location,
                description: fields.description,
                image: None,
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Rejected {
                status: StatusCode::BAD_REQUEST,
                message: rejection.body_text(),
            })?;

        let mut form = ProblemForm::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("location") => {
                    form.location = Some(field.text().await.map_err(multipart_error)?)
                }
                Some("description") => {
                    form.description = Some(field.text().await.map_err(multipart_error)?)
                }
                Some("image") if form.image.is_none() => {
                    let file_name = field.file_name().map(str::to_string);
                    let content_type = field.content_type().and_then(|ct| ct.parse().ok());
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    // Browsers send an empty part when no file was chosen.
                    if !bytes.is_empty() {
                        form.image = Some(Upload {
                            bytes,
                            content_type,
                            file_name,
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[tokio::test]
    async fn path_id_rejects_non_uuids() {
        use axum::{routing::get, Router};
        use tower::ServiceExt;

        async fn echo(PathId(id): PathId) -> String {
            id.to_string()
        }
        let app = Router::new().route("/things/{id}", get(echo));

        let id = Uuid::now_v7();
        let ok = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .uri(format!("/things/{id}"))
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let bad = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/things/42")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }
}
