use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::models::{
    Category, NewCategory, NewProduct, NewReview, NewUser, Product, Review, RoleFlags, User,
};
use super::store::{fold_new_review, fold_toggle, CatalogStore, ReviewToggle, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    categories: BTreeMap<i64, Category>,
    products: BTreeMap<i64, Product>,
    reviews: BTreeMap<i64, Review>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn category_slug_taken(&self, slug: &str, except: Option<i64>) -> bool {
        self.categories
            .values()
            .any(|c| c.slug == slug && Some(c.id) != except)
    }

    fn product_slug_taken(&self, slug: &str, except: Option<i64>) -> bool {
        self.products
            .values()
            .any(|p| p.slug == slug && Some(p.id) != except)
    }
}

/// Process-local store. One lock guards every table, so each operation
/// (including review rating updates) is serialized.
#[derive(Default)]
pub struct MemoryCatalogStore {
    tables: RwLock<Tables>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn available(products: impl Iterator<Item = Product>) -> Vec<Product> {
    products.filter(Product::is_available).collect()
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!("Username '{}' is already taken", user.username)));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("Email '{}' is already registered", user.email)));
        }

        let id = tables.next_id();
        let user = User {
            id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            hashed_password: user.hashed_password,
            is_active: true,
            is_admin: false,
            is_supplier: false,
            is_customer: true,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn set_user_roles(&self, username: &str, roles: RoleFlags) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .values_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| StoreError::NotFound(format!("User {}", username)))?;
        roles.apply(user);
        Ok(user.clone())
    }

    async fn list_active_categories(&self) -> StoreResult<Vec<Category>> {
        let tables = self.tables.read().await;
        Ok(tables.categories.values().filter(|c| c.is_active).cloned().collect())
    }

    async fn find_category_by_id(&self, id: i64) -> StoreResult<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn find_category_by_slug(&self, slug: &str) -> StoreResult<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn create_category(&self, category: NewCategory) -> StoreResult<Category> {
        let mut tables = self.tables.write().await;
        if tables.category_slug_taken(&category.slug, None) {
            return Err(StoreError::Conflict(format!("Category slug '{}' already exists", category.slug)));
        }

        let id = tables.next_id();
        let category = Category {
            id,
            name: category.name,
            slug: category.slug,
            is_active: true,
            parent_id: category.parent_id,
        };
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: i64, update: NewCategory) -> StoreResult<Category> {
        let mut tables = self.tables.write().await;
        if tables.category_slug_taken(&update.slug, Some(id)) {
            return Err(StoreError::Conflict(format!("Category slug '{}' already exists", update.slug)));
        }

        let category = tables
            .categories
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Category {}", id)))?;
        category.name = update.name;
        category.slug = update.slug;
        category.parent_id = update.parent_id;
        Ok(category.clone())
    }

    async fn deactivate_category(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let category = tables
            .categories
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Category {}", id)))?;
        category.is_active = false;
        Ok(())
    }

    async fn child_category_ids(&self, parents: &[i64]) -> StoreResult<Vec<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .values()
            .filter(|c| c.parent_id.map_or(false, |p| parents.contains(&p)))
            .map(|c| c.id)
            .collect())
    }

    async fn list_available_products(&self) -> StoreResult<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(available(tables.products.values().cloned()))
    }

    async fn list_available_products_in(&self, category_ids: &[i64]) -> StoreResult<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(available(
            tables
                .products
                .values()
                .filter(|p| category_ids.contains(&p.category_id))
                .cloned(),
        ))
    }

    async fn find_product_by_id(&self, id: i64) -> StoreResult<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn find_product_by_slug(&self, slug: &str) -> StoreResult<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.values().find(|p| p.slug == slug).cloned())
    }

    async fn create_product(&self, product: NewProduct, supplier_id: Option<i64>) -> StoreResult<Product> {
        let mut tables = self.tables.write().await;
        if tables.product_slug_taken(&product.slug, None) {
            return Err(StoreError::Conflict(format!("Product slug '{}' already exists", product.slug)));
        }

        let id = tables.next_id();
        let product = Product {
            id,
            name: product.name,
            description: product.description,
            slug: product.slug,
            price: product.price,
            image_url: product.image_url,
            stock: product.stock,
            rating: 0.0,
            reviews_count: 0,
            category_id: product.category_id,
            supplier_id,
            is_active: true,
        };
        tables.products.insert(id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: i64, update: NewProduct) -> StoreResult<Product> {
        let mut tables = self.tables.write().await;
        if tables.product_slug_taken(&update.slug, Some(id)) {
            return Err(StoreError::Conflict(format!("Product slug '{}' already exists", update.slug)));
        }

        let product = tables
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Product {}", id)))?;
        product.name = update.name;
        product.description = update.description;
        product.slug = update.slug;
        product.price = update.price;
        product.image_url = update.image_url;
        product.stock = update.stock;
        product.category_id = update.category_id;
        product.is_active = true;
        Ok(product.clone())
    }

    async fn deactivate_product(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Product {}", id)))?;
        product.is_active = false;
        Ok(())
    }

    async fn list_active_reviews(&self) -> StoreResult<Vec<Review>> {
        let tables = self.tables.read().await;
        Ok(tables.reviews.values().filter(|r| r.is_active).cloned().collect())
    }

    async fn list_active_reviews_for(&self, product_id: i64) -> StoreResult<Vec<Review>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .values()
            .filter(|r| r.is_active && r.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn create_review(&self, review: NewReview) -> StoreResult<(Review, Product)> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&review.product_id) {
            return Err(StoreError::NotFound(format!("Product {}", review.product_id)));
        }

        let id = tables.next_id();
        let review = Review {
            id,
            user_id: review.user_id,
            product_id: review.product_id,
            comment: review.comment,
            comment_date: Utc::now(),
            grade: review.grade,
            is_active: true,
        };
        tables.reviews.insert(id, review.clone());

        let product = tables
            .products
            .get_mut(&review.product_id)
            .ok_or_else(|| StoreError::NotFound(format!("Product {}", review.product_id)))?;
        fold_new_review(product, review.grade);
        Ok((review, product.clone()))
    }

    async fn toggle_review(&self, id: i64) -> StoreResult<ReviewToggle> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let review = tables
            .reviews
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Review {}", id)))?;
        let product = tables
            .products
            .get_mut(&review.product_id)
            .ok_or_else(|| StoreError::NotFound(format!("Product {}", review.product_id)))?;

        fold_toggle(review, product);
        Ok(ReviewToggle {
            review: review.clone(),
            product: product.clone(),
        })
    }
}
