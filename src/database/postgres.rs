use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{
    Category, NewCategory, NewProduct, NewReview, NewUser, Product, Review, RoleFlags, User,
};
use super::store::{fold_new_review, fold_toggle, CatalogStore, ReviewToggle, StoreError, StoreResult};

const USER_COLUMNS: &str = "id, first_name, last_name, username, email, hashed_password, \
                            is_active, is_admin, is_supplier, is_customer";
const CATEGORY_COLUMNS: &str = "id, name, slug, is_active, parent_id";
const PRODUCT_COLUMNS: &str = "id, name, description, slug, price, image_url, stock, rating, \
                               reviews_count, category_id, supplier_id, is_active";
const REVIEW_COLUMNS: &str = "id, user_id, product_id, comment, comment_date, grade, is_active";

/// Map unique-constraint violations to `Conflict`, everything else passes through
fn conflict_on_unique(message: impl Into<String>) -> impl FnOnce(sqlx::Error) -> StoreError {
    let message = message.into();
    move |err| {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::Conflict(message);
            }
        }
        StoreError::Sqlx(err)
    }
}

/// Catalog persistence on PostgreSQL
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (first_name, last_name, username, email, hashed_password) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.hashed_password)
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_on_unique("Username or email is already registered"))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_user_roles(&self, username: &str, roles: RoleFlags) -> StoreResult<User> {
        let sql = format!(
            "UPDATE users SET \
                is_admin = COALESCE($2, is_admin), \
                is_supplier = COALESCE($3, is_supplier), \
                is_customer = COALESCE($4, is_customer) \
             WHERE username = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(roles.is_admin)
            .bind(roles.is_supplier)
            .bind(roles.is_customer)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("User {}", username)))
    }

    async fn list_active_categories(&self) -> StoreResult<Vec<Category>> {
        let sql = format!("SELECT {} FROM category WHERE is_active ORDER BY id", CATEGORY_COLUMNS);
        Ok(sqlx::query_as::<_, Category>(&sql).fetch_all(&self.pool).await?)
    }

    async fn find_category_by_id(&self, id: i64) -> StoreResult<Option<Category>> {
        let sql = format!("SELECT {} FROM category WHERE id = $1", CATEGORY_COLUMNS);
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_category_by_slug(&self, slug: &str) -> StoreResult<Option<Category>> {
        let sql = format!("SELECT {} FROM category WHERE slug = $1", CATEGORY_COLUMNS);
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_category(&self, category: NewCategory) -> StoreResult<Category> {
        let sql = format!(
            "INSERT INTO category (name, slug, parent_id) VALUES ($1, $2, $3) RETURNING {}",
            CATEGORY_COLUMNS
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(category.parent_id)
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_on_unique(format!("Category slug '{}' already exists", category.slug)))
    }

    async fn update_category(&self, id: i64, category: NewCategory) -> StoreResult<Category> {
        let sql = format!(
            "UPDATE category SET name = $2, slug = $3, parent_id = $4 WHERE id = $1 RETURNING {}",
            CATEGORY_COLUMNS
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(category.parent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conflict_on_unique(format!("Category slug '{}' already exists", category.slug)))?
            .ok_or_else(|| StoreError::NotFound(format!("Category {}", id)))
    }

    async fn deactivate_category(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("UPDATE category SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Category {}", id)));
        }
        Ok(())
    }

    async fn child_category_ids(&self, parents: &[i64]) -> StoreResult<Vec<i64>> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT id FROM category WHERE parent_id = ANY($1)")
            .bind(parents)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_available_products(&self) -> StoreResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM product WHERE is_active AND stock > 0 ORDER BY id",
            PRODUCT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Product>(&sql).fetch_all(&self.pool).await?)
    }

    async fn list_available_products_in(&self, category_ids: &[i64]) -> StoreResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM product WHERE is_active AND stock > 0 AND category_id = ANY($1) ORDER BY id",
            PRODUCT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(category_ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_product_by_id(&self, id: i64) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {} FROM product WHERE id = $1", PRODUCT_COLUMNS);
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_product_by_slug(&self, slug: &str) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {} FROM product WHERE slug = $1", PRODUCT_COLUMNS);
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_product(&self, product: NewProduct, supplier_id: Option<i64>) -> StoreResult<Product> {
        let sql = format!(
            "INSERT INTO product (name, description, slug, price, image_url, stock, category_id, supplier_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            PRODUCT_COLUMNS
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(&product.name)
            .bind(&product.description)
            .bind(&product.slug)
            .bind(product.price)
            .bind(&product.image_url)
            .bind(product.stock)
            .bind(product.category_id)
            .bind(supplier_id)
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_on_unique(format!("Product slug '{}' already exists", product.slug)))
    }

    async fn update_product(&self, id: i64, product: NewProduct) -> StoreResult<Product> {
        let sql = format!(
            "UPDATE product SET name = $2, description = $3, slug = $4, price = $5, image_url = $6, \
                stock = $7, category_id = $8, is_active = TRUE \
             WHERE id = $1 RETURNING {}",
            PRODUCT_COLUMNS
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(&product.name)
            .bind(&product.description)
            .bind(&product.slug)
            .bind(product.price)
            .bind(&product.image_url)
            .bind(product.stock)
            .bind(product.category_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conflict_on_unique(format!("Product slug '{}' already exists", product.slug)))?
            .ok_or_else(|| StoreError::NotFound(format!("Product {}", id)))
    }

    async fn deactivate_product(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("UPDATE product SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Product {}", id)));
        }
        Ok(())
    }

    async fn list_active_reviews(&self) -> StoreResult<Vec<Review>> {
        let sql = format!("SELECT {} FROM review WHERE is_active ORDER BY id", REVIEW_COLUMNS);
        Ok(sqlx::query_as::<_, Review>(&sql).fetch_all(&self.pool).await?)
    }

    async fn list_active_reviews_for(&self, product_id: i64) -> StoreResult<Vec<Review>> {
        let sql = format!(
            "SELECT {} FROM review WHERE is_active AND product_id = $1 ORDER BY id",
            REVIEW_COLUMNS
        );
        Ok(sqlx::query_as::<_, Review>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_review(&self, review: NewReview) -> StoreResult<(Review, Product)> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent rating updates on the same product
        let lock_sql = format!("SELECT {} FROM product WHERE id = $1 FOR UPDATE", PRODUCT_COLUMNS);
        let mut product = sqlx::query_as::<_, Product>(&lock_sql)
            .bind(review.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Product {}", review.product_id)))?;

        let insert_sql = format!(
            "INSERT INTO review (user_id, product_id, comment, grade) VALUES ($1, $2, $3, $4) RETURNING {}",
            REVIEW_COLUMNS
        );
        let created = sqlx::query_as::<_, Review>(&insert_sql)
            .bind(review.user_id)
            .bind(review.product_id)
            .bind(&review.comment)
            .bind(review.grade)
            .fetch_one(&mut *tx)
            .await?;

        fold_new_review(&mut product, created.grade);
        store_aggregate(&mut tx, &product).await?;

        tx.commit().await?;
        Ok((created, product))
    }

    async fn toggle_review(&self, id: i64) -> StoreResult<ReviewToggle> {
        let mut tx = self.pool.begin().await?;

        let review_sql = format!("SELECT {} FROM review WHERE id = $1 FOR UPDATE", REVIEW_COLUMNS);
        let mut review = sqlx::query_as::<_, Review>(&review_sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Review {}", id)))?;

        let product_sql = format!("SELECT {} FROM product WHERE id = $1 FOR UPDATE", PRODUCT_COLUMNS);
        let mut product = sqlx::query_as::<_, Product>(&product_sql)
            .bind(review.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Product {}", review.product_id)))?;

        fold_toggle(&mut review, &mut product);

        sqlx::query("UPDATE review SET is_active = $2 WHERE id = $1")
            .bind(review.id)
            .bind(review.is_active)
            .execute(&mut *tx)
            .await?;
        store_aggregate(&mut tx, &product).await?;

        tx.commit().await?;
        Ok(ReviewToggle { review, product })
    }
}

async fn store_aggregate(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    product: &Product,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE product SET rating = $2, reviews_count = $3 WHERE id = $1")
        .bind(product.id)
        .bind(product.rating)
        .bind(product.reviews_count)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
