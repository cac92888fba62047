use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::auth::{Identity, Requirement};
use crate::catalog::slugify;
use crate::database::models::{Category, NewCategory};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Transaction};
use crate::state::AppState;

const MUTATE: Requirement = Requirement::ADMIN;

#[derive(Debug, Deserialize)]
pub struct CreateCategory {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

impl CreateCategory {
    /// Validate the payload against the store and derive the slug
    async fn resolve(self, state: &AppState) -> Result<NewCategory, ApiError> {
        let slug = slugify(&self.name);
        if slug.is_empty() {
            return Err(ApiError::invalid_field("name", "Name must contain letters or digits"));
        }

        if let Some(parent_id) = self.parent_id {
            if state.store.find_category_by_id(parent_id).await?.is_none() {
                return Err(ApiError::not_found(format!("Parent category {} not found", parent_id)));
            }
        }

        Ok(NewCategory {
            name: self.name,
            slug,
            parent_id: self.parent_id,
        })
    }
}

async fn category_by_slug(state: &AppState, slug: &str) -> Result<Category, ApiError> {
    state
        .store
        .find_category_by_slug(slug)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Category {} not found", slug)))
}

/// POST /categories/
pub async fn category_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateCategory>,
) -> ApiResult<Category> {
    MUTATE.check(&identity)?;

    let new_category = payload.resolve(&state).await?;
    let category = state.store.create_category(new_category).await?;

    tracing::info!("Category '{}' created by '{}'", category.slug, identity.username);
    Ok(ApiResponse::created(category))
}

/// PUT /categories/:slug
pub async fn category_put(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(slug): Path<String>,
    Json(payload): Json<CreateCategory>,
) -> ApiResult<Category> {
    MUTATE.check(&identity)?;

    let existing = category_by_slug(&state, &slug).await?;
    if payload.parent_id == Some(existing.id) {
        return Err(ApiError::invalid_field("parent_id", "A category cannot be its own parent"));
    }

    let update = payload.resolve(&state).await?;
    let category = state.store.update_category(existing.id, update).await?;

    tracing::info!("Category '{}' updated to '{}' by '{}'", slug, category.slug, identity.username);
    Ok(ApiResponse::success(category))
}

/// DELETE /categories/:slug - soft delete
pub async fn category_delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(slug): Path<String>,
) -> ApiResult<Transaction> {
    MUTATE.check(&identity)?;

    let existing = category_by_slug(&state, &slug).await?;
    state.store.deactivate_category(existing.id).await?;

    tracing::info!("Category '{}' deactivated by '{}'", slug, identity.username);
    Ok(ApiResponse::success(Transaction::success()))
}
