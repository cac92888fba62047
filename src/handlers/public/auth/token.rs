// handlers/public/auth/token.rs - POST /auth/token handler

use axum::{extract::State, Form, Json};
use serde::{Deserialize, Serialize};

use crate::auth::password::{verify_password_async, DUMMY_HASH};
use crate::error::ApiError;
use crate::state::AppState;

/// OAuth2 password-flow form. Extra form fields (grant_type, scope) are ignored.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// POST /auth/token - exchange username/password for a bearer token.
///
/// Responds with the bare OAuth2 shape `{access_token, token_type}` so
/// standard password-flow clients can consume it.
pub async fn token_post(
    State(state): State<AppState>,
    Form(form): Form<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state.store.find_user_by_username(&form.username).await?;

    // Unknown usernames still pay for a verification
    let stored_hash = user
        .as_ref()
        .map_or_else(|| DUMMY_HASH.to_string(), |user| user.hashed_password.clone());
    let verified = verify_password_async(form.password, stored_hash).await;

    let user = user
        .filter(|user| verified && user.is_active)
        .ok_or_else(|| {
            tracing::warn!("Failed login attempt for '{}'", form.username);
            ApiError::unauthorized("Invalid authentication credentials")
        })?;

    let access_token = state.tokens.issue(&user.identity())?;
    tracing::info!("Issued access token for '{}' (id {})", user.username, user.id);

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}
