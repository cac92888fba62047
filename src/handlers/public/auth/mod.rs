// handlers/public/auth/mod.rs - Public authentication handlers
//
// Token acquisition and registration; neither requires a bearer token.

pub mod register; // POST /auth/ - create new account
pub mod token; // POST /auth/token - exchange credentials for a bearer token
pub mod utils;

pub use register::register_post;
pub use token::token_post;
