#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};

use storefront_api::auth::{Identity, TokenService};
use storefront_api::config::AppConfig;
use storefront_api::database::models::RoleFlags;
use storefront_api::database::{CatalogStore, MemoryCatalogStore};
use storefront_api::server;
use storefront_api::state::AppState;

pub const PASSWORD: &str = "correct-horse-battery";

/// In-process API server on a private in-memory store
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    pub store: Arc<MemoryCatalogStore>,
    pub tokens: TokenService,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = AppConfig::development();
        let store = Arc::new(MemoryCatalogStore::new());
        let tokens = TokenService::from_config(&config.security)?;
        let state = AppState::new(store.clone(), tokens.clone());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind {}", base_url))?;
        let app = server::app(state, &config);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self {
            base_url,
            client: Client::new(),
            store,
            tokens,
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token)
    }

    pub fn put(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(token)
    }

    pub fn delete(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(token)
    }

    /// POST /auth/ with a derived email and the shared test password
    pub async fn register(&self, username: &str) -> Result<reqwest::Response> {
        let resp = self
            .client
            .post(self.url("/auth/"))
            .json(&json!({
                "first_name": "Test",
                "last_name": username,
                "username": username,
                "email": format!("{}@example.com", username),
                "password": PASSWORD,
            }))
            .send()
            .await?;
        Ok(resp)
    }

    /// OAuth2 password flow against /auth/token
    pub async fn login(&self, username: &str, password: &str) -> Result<reqwest::Response> {
        let resp = self
            .client
            .post(self.url("/auth/token"))
            .form(&[("grant_type", "password"), ("username", username), ("password", password)])
            .send()
            .await?;
        Ok(resp)
    }

    /// Register `username`, set its role flags directly in the store, and
    /// return a fresh bearer token carrying those flags
    pub async fn user_with_roles(&self, username: &str, admin: bool, supplier: bool) -> Result<String> {
        let resp = self.register(username).await?;
        anyhow::ensure!(resp.status() == StatusCode::CREATED, "register {} -> {}", username, resp.status());

        self.store
            .set_user_roles(
                username,
                RoleFlags {
                    is_admin: Some(admin),
                    is_supplier: Some(supplier),
                    is_customer: None,
                },
            )
            .await?;

        let resp = self.login(username, PASSWORD).await?;
        anyhow::ensure!(resp.status() == StatusCode::OK, "login {} -> {}", username, resp.status());
        let body: Value = resp.json().await?;
        body["access_token"]
            .as_str()
            .map(str::to_string)
            .context("token response missing access_token")
    }

    pub async fn identity_of(&self, username: &str) -> Result<Identity> {
        let user = self
            .store
            .find_user_by_username(username)
            .await?
            .with_context(|| format!("no user {}", username))?;
        Ok(user.identity())
    }
}

/// Status plus parsed body, for terse assertions
pub async fn read(resp: reqwest::Response) -> Result<(StatusCode, Value)> {
    let status = resp.status();
    let body = resp.json::<Value>().await?;
    Ok((status, body))
}
