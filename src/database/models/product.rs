use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub slug: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub image_url: Option<String>,
    pub stock: i32,
    pub rating: f64,
    pub reviews_count: i32,
    pub category_id: i64,
    pub supplier_id: Option<i64>,
    pub is_active: bool,
}

impl Product {
    pub fn is_available(&self) -> bool {
        self.is_active && self.stock > 0
    }
}

/// Insert and full-update payload. Rating fields are owned by the store.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub slug: String,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub stock: i32,
    pub category_id: i64,
}
