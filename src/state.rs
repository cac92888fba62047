use std::sync::Arc;

use crate::auth::TokenService;
use crate::database::CatalogStore;

/// Shared handles injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }
}
