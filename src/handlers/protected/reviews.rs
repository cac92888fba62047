use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::{Identity, Requirement};
use crate::database::models::{NewReview, Product, Review};
use crate::database::ReviewToggle;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

const GRADES: std::ops::RangeInclusive<i32> = 1..=5;

#[derive(Debug, Deserialize)]
pub struct CreateReview {
    pub product_id: i64,
    #[serde(default)]
    pub comment: String,
    pub grade: i32,
}

#[derive(Debug, Serialize)]
pub struct ReviewWithProduct {
    pub review: Review,
    pub product: Product,
}

#[derive(Debug, Serialize)]
pub struct ReviewToggled {
    pub message: String,
    pub review: Review,
    pub product: Product,
}

impl From<ReviewToggle> for ReviewToggled {
    fn from(toggle: ReviewToggle) -> Self {
        let message = if toggle.review.is_active {
            "Review undeleted"
        } else {
            "Review deleted"
        };
        Self {
            message: message.to_string(),
            review: toggle.review,
            product: toggle.product,
        }
    }
}

/// GET /reviews/ - every active review
pub async fn reviews_get(State(state): State<AppState>) -> ApiResult<Vec<Review>> {
    let reviews = state.store.list_active_reviews().await?;
    Ok(ApiResponse::success(reviews))
}

/// GET /reviews/:product_slug - active reviews of one product
pub async fn reviews_by_product_get(
    State(state): State<AppState>,
    Path(product_slug): Path<String>,
) -> ApiResult<Vec<Review>> {
    let product = state
        .store
        .find_product_by_slug(&product_slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    let reviews = state.store.list_active_reviews_for(product.id).await?;
    Ok(ApiResponse::success(reviews))
}

/// POST /reviews/ - supplier-only
pub async fn review_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateReview>,
) -> ApiResult<ReviewWithProduct> {
    Requirement::SUPPLIER.check(&identity)?;

    if !GRADES.contains(&payload.grade) {
        return Err(ApiError::invalid_field(
            "grade",
            format!("Grade must be between {} and {}", GRADES.start(), GRADES.end()),
        ));
    }

    let target = state
        .store
        .find_product_by_id(payload.product_id)
        .await?
        .filter(|p| p.is_active);
    if target.is_none() {
        return Err(ApiError::not_found("Product not found"));
    }

    let (review, product) = state
        .store
        .create_review(NewReview {
            user_id: identity.id,
            product_id: payload.product_id,
            comment: payload.comment,
            grade: payload.grade,
        })
        .await?;

    tracing::info!(
        "Review {} on '{}' by '{}': rating now {:.3} over {} reviews",
        review.id,
        product.slug,
        identity.username,
        product.rating,
        product.reviews_count
    );
    Ok(ApiResponse::created(ReviewWithProduct { review, product }))
}

/// DELETE /reviews/:id - admin-only; toggles the review between deleted
/// and restored, reconciling the product rating each time
pub async fn review_delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(key): Path<String>,
) -> ApiResult<ReviewToggled> {
    Requirement::ADMIN.check(&identity)?;

    let review_id: i64 = key
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid review id '{}'", key)))?;

    let toggle = state.store.toggle_review(review_id).await?;

    tracing::info!(
        "Review {} {} by '{}': '{}' rating now {:.3} over {} reviews",
        review_id,
        if toggle.review.is_active { "restored" } else { "deleted" },
        identity.username,
        toggle.product.slug,
        toggle.product.rating,
        toggle.product.reviews_count
    );
    Ok(ApiResponse::success(ReviewToggled::from(toggle)))
}
