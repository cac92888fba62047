use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::CategoryChildren;
use crate::database::models::{
    Category, NewCategory, NewProduct, NewReview, NewUser, Product, Review, RoleFlags, User,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of toggling a review's active flag
#[derive(Debug, Clone)]
pub struct ReviewToggle {
    pub review: Review,
    pub product: Product,
}

/// Persistence for users, categories, products and reviews.
///
/// Listings return active rows only. Review mutations update the owning
/// product's `rating` and `reviews_count` in the same serialized step.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    // Users
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn set_user_roles(&self, username: &str, roles: RoleFlags) -> StoreResult<User>;

    // Categories
    async fn list_active_categories(&self) -> StoreResult<Vec<Category>>;
    async fn find_category_by_id(&self, id: i64) -> StoreResult<Option<Category>>;
    async fn find_category_by_slug(&self, slug: &str) -> StoreResult<Option<Category>>;
    async fn create_category(&self, category: NewCategory) -> StoreResult<Category>;
    async fn update_category(&self, id: i64, category: NewCategory) -> StoreResult<Category>;
    async fn deactivate_category(&self, id: i64) -> StoreResult<()>;
    /// Ids of categories (active or not) whose parent is any of `parents`
    async fn child_category_ids(&self, parents: &[i64]) -> StoreResult<Vec<i64>>;

    // Products
    async fn list_available_products(&self) -> StoreResult<Vec<Product>>;
    async fn list_available_products_in(&self, category_ids: &[i64]) -> StoreResult<Vec<Product>>;
    async fn find_product_by_id(&self, id: i64) -> StoreResult<Option<Product>>;
    async fn find_product_by_slug(&self, slug: &str) -> StoreResult<Option<Product>>;
    async fn create_product(&self, product: NewProduct, supplier_id: Option<i64>) -> StoreResult<Product>;
    /// Overwrites editable fields and reactivates the product
    async fn update_product(&self, id: i64, product: NewProduct) -> StoreResult<Product>;
    async fn deactivate_product(&self, id: i64) -> StoreResult<()>;

    // Reviews
    async fn list_active_reviews(&self) -> StoreResult<Vec<Review>>;
    async fn list_active_reviews_for(&self, product_id: i64) -> StoreResult<Vec<Review>>;
    /// Inserts the review and folds its grade into the product rating
    async fn create_review(&self, review: NewReview) -> StoreResult<(Review, Product)>;
    /// Flips the review's active flag and reconciles the product rating
    async fn toggle_review(&self, id: i64) -> StoreResult<ReviewToggle>;
}

#[async_trait]
impl<'a> CategoryChildren for dyn CatalogStore + 'a {
    type Error = StoreError;

    async fn children_of(&self, parents: &[i64]) -> Result<Vec<i64>, StoreError> {
        self.child_category_ids(parents).await
    }
}

/// Fold a freshly inserted review's grade into its product
pub(crate) fn fold_new_review(product: &mut Product, grade: i32) {
    product.rating = crate::catalog::apply_new_review(product.rating, product.reviews_count, grade);
    product.reviews_count += 1;
}

/// Flip `review.is_active` and move `product`'s aggregate to match
pub(crate) fn fold_toggle(review: &mut Review, product: &mut Product) {
    if review.is_active {
        product.rating =
            crate::catalog::apply_removed_review(product.rating, product.reviews_count, review.grade);
        product.reviews_count = (product.reviews_count - 1).max(0);
        review.is_active = false;
    } else {
        product.rating =
            crate::catalog::apply_restored_review(product.rating, product.reviews_count, review.grade);
        product.reviews_count += 1;
        review.is_active = true;
    }
}
