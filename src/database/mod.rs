pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryCatalogStore;
pub use postgres::PgCatalogStore;
pub use store::{CatalogStore, ReviewToggle, StoreError, StoreResult};
