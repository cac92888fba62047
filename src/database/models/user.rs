use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::Identity;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub is_supplier: bool,
    pub is_customer: bool,
}

impl User {
    /// Snapshot of this user's roles for token issuance
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            id: self.id,
            is_admin: self.is_admin,
            is_supplier: self.is_supplier,
            is_customer: self.is_customer,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

/// Partial role assignment; `None` leaves a flag untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleFlags {
    pub is_admin: Option<bool>,
    pub is_supplier: Option<bool>,
    pub is_customer: Option<bool>,
}

impl RoleFlags {
    pub fn apply(&self, user: &mut User) {
        if let Some(v) = self.is_admin {
            user.is_admin = v;
        }
        if let Some(v) = self.is_supplier {
            user.is_supplier = v;
        }
        if let Some(v) = self.is_customer {
            user.is_customer = v;
        }
    }
}
