// handlers/protected/auth/whoami.rs - GET /auth/read_current_user handler

use axum::Extension;

use crate::auth::Identity;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /auth/read_current_user - identity decoded from the caller's token.
/// Role flags are the ones frozen into the token at issuance.
pub async fn read_current_user(Extension(identity): Extension<Identity>) -> ApiResult<Identity> {
    Ok(ApiResponse::success(identity))
}
