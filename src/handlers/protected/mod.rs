// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Every route here sits behind `jwt_auth_middleware`, which injects the
// caller's `Identity`. Mutations additionally check a `Requirement`.

pub mod auth;
pub mod categories;
pub mod products;
pub mod reviews;
