use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub comment: String,
    pub comment_date: DateTime<Utc>,
    pub grade: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: i64,
    pub product_id: i64,
    pub comment: String,
    pub grade: i32,
}
