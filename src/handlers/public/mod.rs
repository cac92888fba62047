// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition, registration, the category tree and service status.

pub mod auth;
pub mod categories;
pub mod status;
