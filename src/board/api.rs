use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        FromRequest, FromRequestParts, Query, Request,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, request::Parts},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use super::auth::{TokenService, require_auth};
use super::db::DbHandle;
use super::routes::{auth, issues, projects, users};
use crate::errors::{FieldError, TrackerError};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub tokens: TokenService,
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    Validation(Vec<FieldError>),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::UserNotFound { .. }
            | TrackerError::IssueNotFound { .. }
            | TrackerError::ProjectNotFound { .. } => ApiError::NotFound(err.to_string()),
            TrackerError::EmailTaken { .. } => ApiError::Conflict(err.to_string()),
            TrackerError::Validation(fields) => ApiError::Validation(fields),
            TrackerError::InvalidCredentials | TrackerError::TokenInvalid => {
                ApiError::Unauthorized(err.to_string())
            }
            TrackerError::TokenExpired => ApiError::Forbidden(err.to_string()),
            TrackerError::CodeSpaceExhausted { .. } => ApiError::Internal(err.to_string()),
            TrackerError::Other(e) => ApiError::Internal(format!("{:#}", e)),
        }
    }
}

/// Storage errors arrive as `anyhow::Error`; recover the domain error if
/// there is one, anything else is a server fault.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<TrackerError>() {
            Ok(tracker) => tracker.into(),
            Err(other) => ApiError::Internal(format!("{:#}", other)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(fields) => {
                let body = serde_json::json!({"error": "Validation failed", "fields": fields});
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

// ── Validated JSON extractor ──────────────────────────────────────────

/// Like `Json<T>`, but also runs `T`'s validation rules. Malformed bodies
/// and rule failures both come back as 400 field errors.
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                ApiError::Validation(vec![FieldError::new("body", rejection.body_text())])
            })?;
        value
            .validate()
            .map_err(|errors| ApiError::Validation(field_errors(&errors)))?;
        Ok(Self(value))
    }
}

/// Query-string counterpart of [`ValidJson`].
pub struct ValidQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| {
                ApiError::Validation(vec![FieldError::new("query", rejection.body_text())])
            })?;
        value
            .validate()
            .map_err(|errors| ApiError::Validation(field_errors(&errors)))?;
        Ok(Self(value))
    }
}

fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                FieldError::new(field.to_string(), message)
            })
        })
        .collect();
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

// ── Router ────────────────────────────────────────────────────────────

/// All API routes. Everything except health, registration and the
/// session endpoints sits behind the bearer-token middleware.
pub fn api_router(state: SharedState) -> Router<SharedState> {
    let auth_layer = middleware::from_fn_with_state(state, require_auth);

    let protected = Router::new()
        .route("/api/user/me", get(users::me).patch(users::update_me))
        .route("/api/user/{racfid}", get(users::get_user))
        .route("/api/issues", get(issues::list_issues).post(issues::create_issue))
        .route(
            "/api/issues/{code}",
            get(issues::get_issue)
                .patch(issues::update_issue)
                .delete(issues::delete_issue),
        )
        .route("/api/issues/{code}/move", patch(issues::move_issue))
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/api/projects/{code}",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/api/projects/{code}/board", get(projects::get_board))
        .route("/api/projects/{code}/issues", post(projects::create_issue))
        .route_layer(auth_layer.clone());

    Router::new()
        .route(
            "/api/user",
            post(users::register).merge(get(users::list_users).route_layer(auth_layer)),
        )
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", get(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
        .route("/health", get(health_check))
        .merge(protected)
}

async fn health_check() -> &'static str {
    "ok"
}
