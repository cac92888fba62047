use axum::extract::State;

use crate::database::models::Category;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /categories/ - all active categories
pub async fn categories_get(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    let categories = state.store.list_active_categories().await?;
    Ok(ApiResponse::success(categories))
}
