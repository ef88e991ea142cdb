use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use super::{trimmed, trimmed_option};
use crate::board::api::{ApiError, SharedState, ValidJson};
use crate::board::auth::AuthUser;
use crate::board::models::{NewUser, UserChanges};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[serde(default, deserialize_with = "trimmed_option")]
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

pub async fn register(
    State(state): State<SharedState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = NewUser {
        name: req.name,
        email: req.email,
        password: req.password,
    };
    let user = state.db.call(move |db| db.create_user(&new)).await?;
    tracing::info!(racfid = %user.racfid, "Registered user");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let users = state.db.call(|db| db.list_users()).await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<SharedState>,
    Path(racfid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = racfid.clone();
    match state.db.call(move |db| db.get_user(&lookup)).await? {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::NotFound(format!("User {} not found", racfid))),
    }
}

pub async fn me(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let racfid = auth.racfid.clone();
    match state.db.call(move |db| db.get_user(&racfid)).await? {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::NotFound(format!("User {} not found", auth.racfid))),
    }
}

pub async fn update_me(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = UserChanges {
        name: req.name,
        email: req.email,
        password: req.password,
    };
    let racfid = auth.racfid;
    let user = state
        .db
        .call(move |db| db.update_user(&racfid, &changes))
        .await?;
    tracing::info!(racfid = %user.racfid, "Updated user profile");
    Ok(Json(user))
}
