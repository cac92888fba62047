use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::TokenService;
use crate::config::{AppConfig, Environment};
use crate::database::{CatalogStore, DatabaseManager, MemoryCatalogStore, PgCatalogStore};
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

/// Full route table with global middleware applied
pub fn app(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(cors_layer(config));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::status::root))
        .route("/health", get(public::status::health))
        .route("/auth/", post(public::auth::register_post))
        .route("/auth/token", post(public::auth::token_post))
        .route("/categories/", get(public::categories::categories_get))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{auth, categories, products, reviews};

    Router::new()
        .route("/auth/read_current_user", get(auth::read_current_user))
        // Categories: reads are public, see public_routes
        .route("/categories/", post(categories::category_post))
        .route(
            "/categories/:slug",
            axum::routing::put(categories::category_put).delete(categories::category_delete),
        )
        // Products
        .route("/products/", get(products::products_get).post(products::product_post))
        .route(
            "/products/:slug",
            get(products::products_by_category_get)
                .put(products::product_put)
                .delete(products::product_delete),
        )
        .route("/products/details/:slug", get(products::product_details_get))
        // Reviews
        .route("/reviews/", get(reviews::reviews_get).post(reviews::review_post))
        .route(
            "/reviews/:key",
            get(reviews::reviews_by_product_get).delete(reviews::review_delete),
        )
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if matches!(config.environment, Environment::Development) {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Wire the store and token service described by `config`.
/// `in_memory` skips PostgreSQL entirely.
pub async fn build_state(config: &AppConfig, in_memory: bool) -> anyhow::Result<AppState> {
    let tokens = TokenService::from_config(&config.security).context("invalid token configuration")?;

    let store: Arc<dyn CatalogStore> = if in_memory {
        tracing::warn!("Using in-memory catalog store; data is lost on exit");
        Arc::new(MemoryCatalogStore::new())
    } else {
        let pool = DatabaseManager::connect(&config.database).await?;
        DatabaseManager::migrate(&pool).await?;
        Arc::new(PgCatalogStore::new(pool))
    };

    Ok(AppState::new(store, tokens))
}

/// Bind and serve until the process is stopped
pub async fn serve(config: &AppConfig, state: AppState, port: u16) -> anyhow::Result<()> {
    if matches!(config.environment, Environment::Development) {
        tracing::warn!("Running in development mode; do not use the default SECRET_KEY in production");
    }

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Storefront API listening on http://{}", bind_addr);
    tracing::info!("Access tokens expire after {} minutes", state.tokens.ttl().num_minutes());
    axum::serve(listener, app(state, config)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = AppConfig::development();
        let tokens = TokenService::from_config(&config.security).unwrap();
        let state = AppState::new(Arc::new(MemoryCatalogStore::new()), tokens);
        app(state, &config)
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn banner_and_health_are_public() {
        let (status, body) = send(test_app(), Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Storefront API");

        let (status, _) = send(test_app(), Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn category_listing_is_public_but_creation_is_not() {
        let (status, body) = send(test_app(), Request::get("/categories/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], serde_json::json!([]));

        let request = Request::post("/categories/")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"Toys"}"#))
            .unwrap();
        let (status, body) = send(test_app(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn protected_routes_reject_malformed_header() {
        let request = Request::get("/products/")
            .header("authorization", "Token abc")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(test_app(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn oversized_bodies_are_rejected() {
        let mut config = AppConfig::development();
        config.api.max_request_size_bytes = 16;
        let tokens = TokenService::from_config(&config.security).unwrap();
        let state = AppState::new(Arc::new(MemoryCatalogStore::new()), tokens);

        let request = Request::post("/auth/")
            .header("content-type", "application/json")
            .body(Body::from(format!(r#"{{"username":"{}"}}"#, "x".repeat(64))))
            .unwrap();
        let response = app(state, &config).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
