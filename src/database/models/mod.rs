pub mod category;
pub mod product;
pub mod review;
pub mod user;

pub use category::{Category, NewCategory};
pub use product::{NewProduct, Product};
pub use review::{NewReview, Review};
pub use user::{NewUser, RoleFlags, User};
