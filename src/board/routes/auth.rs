use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::board::api::{ApiError, SharedState, ValidJson};
use crate::board::models::User;
use crate::errors::TrackerError;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "RACFID is required"))]
    pub racfid: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub user: User,
}

pub async fn login(
    State(state): State<SharedState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let racfid = req.racfid.clone();
    let user = match state
        .db
        .call(move |db| db.authenticate(&req.racfid, &req.password))
        .await
    {
        Ok(user) => user,
        Err(e) => {
            if matches!(
                e.downcast_ref::<TrackerError>(),
                Some(TrackerError::InvalidCredentials)
            ) {
                tracing::warn!(racfid = %racfid, "Rejected sign-in");
            }
            return Err(e.into());
        }
    };

    let pair = state.tokens.issue_pair(&user.racfid)?;
    tracing::info!(racfid = %user.racfid, "Signed in");
    Ok((
        [(header::SET_COOKIE, state.tokens.refresh_cookie(&pair.refresh))],
        Json(TokenResponse {
            access_token: pair.access,
            user,
        }),
    ))
}

/// Trade the refresh cookie for a fresh token pair. The cookie is rotated
/// on every successful refresh.
pub async fn refresh(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = state
        .tokens
        .refresh_token_from_headers(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing refresh token".into()))?;
    let claims = state.tokens.verify_refresh(&token)?;

    let racfid = claims.sub.clone();
    let user = state
        .db
        .call(move |db| db.get_user(&racfid))
        .await?
        .ok_or_else(|| ApiError::Unauthorized(format!("User {} no longer exists", claims.sub)))?;

    let pair = state.tokens.issue_pair(&user.racfid)?;
    tracing::info!(racfid = %user.racfid, "Refreshed session");
    Ok((
        [(header::SET_COOKIE, state.tokens.refresh_cookie(&pair.refresh))],
        Json(TokenResponse {
            access_token: pair.access,
            user,
        }),
    ))
}

pub async fn logout(State(state): State<SharedState>) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, state.tokens.clear_cookie())],
    )
}
