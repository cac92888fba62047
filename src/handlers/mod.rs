// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) -> Protected (bearer token, plus per-route capability checks)

pub mod protected;
pub mod public;
