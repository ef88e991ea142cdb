use std::borrow::Cow;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use super::{double_option, trimmed, trimmed_option};
use crate::board::api::{ApiError, SharedState, ValidJson, ValidQuery};
use crate::board::models::{IssueCategory, IssueChanges, IssueColumn, IssueFilter, NewIssue};

const MAX_STORY_POINTS: u32 = 100;

fn default_backlog() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateIssueRequest {
    /// Project code; omitted when the request comes in under a project path.
    pub project: Option<String>,
    pub category: IssueCategory,
    #[serde(default = "default_backlog")]
    pub backlog: bool,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: String,
    #[validate(range(max = 100, message = "Story points must be at most 100"))]
    pub story_points: Option<u32>,
    #[validate(length(max = 100, message = "Assignee must be at most 100 characters"))]
    pub assignee: Option<String>,
    #[serde(default)]
    pub column: IssueColumn,
}

impl CreateIssueRequest {
    pub fn into_new_issue(self, project: Option<String>) -> NewIssue {
        NewIssue {
            project: project.or(self.project),
            category: self.category,
            backlog: self.backlog,
            name: self.name,
            description: self.description,
            story_points: self.story_points,
            assignee: self.assignee,
            column: self.column,
        }
    }
}

/// Partial update. An explicit `null` clears `story_points` or `assignee`.
#[derive(Debug, Deserialize)]
pub struct UpdateIssueRequest {
    pub category: Option<IssueCategory>,
    #[serde(default, deserialize_with = "trimmed_option")]
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub story_points: Option<Option<u32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee: Option<Option<String>>,
}

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

// Hand-written: the derive cannot see through the nested options.
impl Validate for UpdateIssueRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            let len = name.chars().count();
            if len == 0 || len > 200 {
                errors.add("name", rule("length", "Name must be 1-200 characters"));
            }
        }
        if let Some(description) = &self.description {
            if description.chars().count() > 10000 {
                errors.add(
                    "description",
                    rule("length", "Description must be at most 10000 characters"),
                );
            }
        }
        if let Some(Some(points)) = self.story_points {
            if points > MAX_STORY_POINTS {
                errors.add("story_points", rule("range", "Story points must be at most 100"));
            }
        }
        if let Some(Some(assignee)) = &self.assignee {
            if assignee.chars().count() > 100 {
                errors.add(
                    "assignee",
                    rule("length", "Assignee must be at most 100 characters"),
                );
            }
        }
        if errors.field_errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct MoveIssueRequest {
    pub column: IssueColumn,
    /// Clamped to the target lane by the store.
    pub position: i64,
    pub backlog: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListIssuesQuery {
    pub project: Option<String>,
    pub backlog: Option<bool>,
}

pub async fn list_issues(
    State(state): State<SharedState>,
    ValidQuery(query): ValidQuery<ListIssuesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = IssueFilter {
        project: query.project,
        backlog: query.backlog,
    };
    let issues = state.db.call(move |db| db.list_issues(&filter)).await?;
    Ok(Json(issues))
}

pub async fn create_issue(
    State(state): State<SharedState>,
    ValidJson(req): ValidJson<CreateIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = req.into_new_issue(None);
    let issue = state.db.call(move |db| db.create_issue(&new)).await?;
    tracing::info!(code = %issue.code, project = ?issue.project, "Created issue");
    Ok((StatusCode::CREATED, Json(issue)))
}

pub async fn get_issue(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = code.clone();
    match state.db.call(move |db| db.get_issue(&lookup)).await? {
        Some(issue) => Ok(Json(issue)),
        None => Err(ApiError::NotFound(format!("Issue {} not found", code))),
    }
}

pub async fn update_issue(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    ValidJson(req): ValidJson<UpdateIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = IssueChanges {
        category: req.category,
        name: req.name,
        description: req.description,
        story_points: req.story_points,
        assignee: req.assignee,
    };
    let issue = state
        .db
        .call(move |db| db.update_issue(&code, &changes))
        .await?;
    tracing::info!(code = %issue.code, "Updated issue");
    Ok(Json(issue))
}

pub async fn move_issue(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    ValidJson(req): ValidJson<MoveIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let issue = state
        .db
        .call(move |db| db.move_issue(&code, req.column, req.position, req.backlog))
        .await?;
    tracing::info!(
        code = %issue.code,
        column = issue.column.as_str(),
        position = issue.position,
        "Moved issue"
    );
    Ok(Json(issue))
}

pub async fn delete_issue(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = code.clone();
    if state.db.call(move |db| db.delete_issue(&lookup)).await? {
        tracing::info!(code = %code, "Deleted issue");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Issue {} not found", code)))
    }
}
