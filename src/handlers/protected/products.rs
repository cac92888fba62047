use axum::{
    extract::{Path, State},
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::auth::{Identity, Requirement};
use crate::catalog::{descendant_ids, slugify};
use crate::database::models::{NewProduct, Product};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Transaction};
use crate::state::AppState;

const MUTATE: Requirement = Requirement::ADMIN_OR_SUPPLIER;

#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    pub stock: i32,
    #[serde(alias = "category")]
    pub category_id: i64,
}

impl CreateProduct {
    /// Validate the payload against the store and derive the slug
    async fn resolve(self, state: &AppState) -> Result<NewProduct, ApiError> {
        let slug = slugify(&self.name);
        if slug.is_empty() {
            return Err(ApiError::invalid_field("name", "Name must contain letters or digits"));
        }
        if self.price.is_sign_negative() {
            return Err(ApiError::invalid_field("price", "Price cannot be negative"));
        }
        if self.stock < 0 {
            return Err(ApiError::invalid_field("stock", "Stock cannot be negative"));
        }
        if state.store.find_category_by_id(self.category_id).await?.is_none() {
            return Err(ApiError::not_found("There is no category found"));
        }

        Ok(NewProduct {
            name: self.name,
            description: self.description,
            slug,
            price: self.price,
            image_url: self.image_url,
            stock: self.stock,
            category_id: self.category_id,
        })
    }
}

async fn product_by_slug(state: &AppState, slug: &str) -> Result<Product, ApiError> {
    state
        .store
        .find_product_by_slug(slug)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Product {} not found", slug)))
}

/// Admins may change any product; suppliers only their own
fn ensure_owner(identity: &Identity, product: &Product) -> Result<(), ApiError> {
    if identity.is_admin || product.supplier_id == Some(identity.id) {
        return Ok(());
    }
    tracing::warn!(
        "User '{}' tried to modify product '{}' owned by {:?}",
        identity.username,
        product.slug,
        product.supplier_id
    );
    Err(ApiError::forbidden("Permission denied"))
}

/// GET /products/ - active products with stock
pub async fn products_get(State(state): State<AppState>) -> ApiResult<Vec<Product>> {
    let products = state.store.list_available_products().await?;
    Ok(ApiResponse::success(products))
}

/// GET /products/:category_slug - available products in the category and
/// every subcategory beneath it
pub async fn products_by_category_get(
    State(state): State<AppState>,
    Path(category_slug): Path<String>,
) -> ApiResult<Vec<Product>> {
    let category = state
        .store
        .find_category_by_slug(&category_slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    let category_ids: Vec<i64> = descendant_ids(&*state.store, category.id).await?.into_iter().collect();
    let products = state.store.list_available_products_in(&category_ids).await?;
    Ok(ApiResponse::success(products))
}

/// GET /products/details/:slug - a single active product, in stock or not
pub async fn product_details_get(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Product> {
    let product = product_by_slug(&state, &slug).await?;
    if !product.is_active {
        return Err(ApiError::not_found(format!("Product {} not found", slug)));
    }
    Ok(ApiResponse::success(product))
}

/// POST /products/
pub async fn product_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateProduct>,
) -> ApiResult<Product> {
    MUTATE.check(&identity)?;

    let new_product = payload.resolve(&state).await?;
    let product = state.store.create_product(new_product, Some(identity.id)).await?;

    tracing::info!("Product '{}' created by '{}'", product.slug, identity.username);
    Ok(ApiResponse::created(product))
}

/// PUT /products/:slug - overwrite editable fields; also reactivates
pub async fn product_put(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(slug): Path<String>,
    Json(payload): Json<CreateProduct>,
) -> ApiResult<Product> {
    MUTATE.check(&identity)?;

    let existing = product_by_slug(&state, &slug).await?;
    ensure_owner(&identity, &existing)?;

    let update = payload.resolve(&state).await?;
    let product = state.store.update_product(existing.id, update).await?;

    tracing::info!("Product '{}' updated by '{}'", product.slug, identity.username);
    Ok(ApiResponse::success(product))
}

/// DELETE /products/:slug - soft delete
pub async fn product_delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(slug): Path<String>,
) -> ApiResult<Transaction> {
    MUTATE.check(&identity)?;

    let existing = product_by_slug(&state, &slug).await?;
    ensure_owner(&identity, &existing)?;
    state.store.deactivate_product(existing.id).await?;

    tracing::info!("Product '{}' deactivated by '{}'", slug, identity.username);
    Ok(ApiResponse::success(Transaction::success()))
}
