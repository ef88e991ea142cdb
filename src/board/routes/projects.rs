use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use super::issues::CreateIssueRequest;
use super::{trimmed, trimmed_option, validate_racfids};
use crate::board::api::{ApiError, SharedState, ValidJson};
use crate::board::models::{NewProject, ProjectChanges};
use crate::errors::FieldError;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: String,
    #[validate(custom(function = "validate_racfids"))]
    pub users: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[serde(default, deserialize_with = "trimmed_option")]
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: Option<String>,
    /// Replaces the member list; must stay non-empty.
    pub users: Option<Vec<String>>,
}

pub async fn list_projects(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, ApiError> {
    let projects = state.db.call(|db| db.list_projects()).await?;
    Ok(Json(projects))
}

pub async fn create_project(
    State(state): State<SharedState>,
    ValidJson(req): ValidJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = NewProject {
        name: req.name,
        description: req.description,
        users: req.users,
    };
    let project = state.db.call(move |db| db.create_project(&new)).await?;
    tracing::info!(code = %project.code, members = project.users.len(), "Created project");
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = code.clone();
    match state.db.call(move |db| db.get_project(&lookup)).await? {
        Some(project) => Ok(Json(project)),
        None => Err(ApiError::NotFound(format!("Project {} not found", code))),
    }
}

pub async fn update_project(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    ValidJson(req): ValidJson<UpdateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(users) = &req.users {
        validate_racfids(users).map_err(|e| {
            ApiError::Validation(vec![FieldError::new(
                "users",
                e.message.map(|m| m.to_string()).unwrap_or_default(),
            )])
        })?;
    }
    let changes = ProjectChanges {
        name: req.name,
        description: req.description,
        users: req.users,
    };
    let project = state
        .db
        .call(move |db| db.update_project(&code, &changes))
        .await?;
    tracing::info!(code = %project.code, "Updated project");
    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = code.clone();
    if state.db.call(move |db| db.delete_project(&lookup)).await? {
        tracing::info!(code = %code, "Deleted project and its issues");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Project {} not found", code)))
    }
}

pub async fn get_board(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state.db.call(move |db| db.get_board(&code)).await?;
    Ok(Json(board))
}

/// Create an issue filed under the project in the path.
pub async fn create_issue(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    ValidJson(req): ValidJson<CreateIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = req.into_new_issue(Some(code));
    let issue = state.db.call(move |db| db.create_issue(&new)).await?;
    tracing::info!(code = %issue.code, project = ?issue.project, "Created issue");
    Ok((StatusCode::CREATED, Json(issue)))
}
