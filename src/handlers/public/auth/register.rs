// handlers/public/auth/register.rs - POST /auth/ handler

use axum::{extract::State, Json};
use serde::Deserialize;

use super::utils::{validate_email_format, validate_username_format};
use crate::auth::password::hash_password_async;
use crate::database::models::{NewUser, User};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// POST /auth/ - register a new account.
///
/// New accounts are customers only; admin and supplier flags are granted
/// out of band (see the `storefront user grant` command).
pub async fn register_post(
    State(state): State<AppState>,
    Json(payload): Json<CreateUser>,
) -> ApiResult<User> {
    validate_username_format(&payload.username).map_err(|e| ApiError::invalid_field("username", e))?;
    validate_email_format(&payload.email).map_err(|e| ApiError::invalid_field("email", e))?;
    if payload.password.is_empty() {
        return Err(ApiError::invalid_field("password", "Password cannot be empty"));
    }

    let hashed_password = hash_password_async(payload.password).await?;
    let user = state
        .store
        .create_user(NewUser {
            first_name: payload.first_name,
            last_name: payload.last_name,
            username: payload.username,
            email: payload.email,
            hashed_password,
        })
        .await?;

    tracing::info!("Registered user '{}' (id {})", user.username, user.id);
    Ok(ApiResponse::created(user))
}
