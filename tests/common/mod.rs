#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, jwk::JwkSet, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use drinks_api::auth::{AuthGate, KeySource};
use drinks_api::config::AppConfig;
use drinks_api::database::{DrinkStore, MemoryDrinkStore};
use drinks_api::{app, AppState};

pub const SECRET: &[u8] = b"drinks-api-test-hmac-secret-01";
/// base64url of SECRET, as it appears in an `oct` JWK
pub const SECRET_K: &str = "ZHJpbmtzLWFwaS10ZXN0LWhtYWMtc2VjcmV0LTAx";
pub const KID: &str = "test-key-1";
pub const ISSUER: &str = "https://coffee-shop.test/";
pub const AUDIENCE: &str = "drinks";

pub const MANAGER: &[&str] = &[
    "get:drinks-detail",
    "post:drinks",
    "patch:drinks",
    "delete:drinks",
];
pub const BARISTA: &[&str] = &["get:drinks-detail"];

pub fn jwks() -> JwkSet {
    serde_json::from_value(json!({
        "keys": [{"kty": "oct", "kid": KID, "k": SECRET_K}]
    }))
    .expect("valid test key set")
}

pub fn gate(keys: KeySource) -> Arc<AuthGate> {
    Arc::new(AuthGate::new(keys, Algorithm::HS256, AUDIENCE, ISSUER, 0))
}

/// Sign arbitrary claims with the test key.
pub fn sign(claims: &Value) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(KID.to_string());
    encode(&header, claims, &EncodingKey::from_secret(SECRET)).expect("signing test token")
}

pub fn standard_claims() -> Value {
    json!({
        "iss": ISSUER,
        "aud": AUDIENCE,
        "sub": "auth0|test-user",
        "iat": Utc::now().timestamp(),
        "exp": Utc::now().timestamp() + 3600,
    })
}

/// A valid token granting exactly `permissions`.
pub fn token(permissions: &[&str]) -> String {
    let mut claims = standard_claims();
    claims["permissions"] = json!(permissions);
    sign(&claims)
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryDrinkStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_keys(KeySource::Static(jwks()))
    }

    pub fn with_keys(keys: KeySource) -> Self {
        let store = Arc::new(MemoryDrinkStore::new());
        let state = AppState::new(store.clone(), gate(keys));
        let router = app(state, &AppConfig::from_env());
        Self { router, store }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("reading response body")?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .with_context(|| format!("non-JSON body: {}", String::from_utf8_lossy(&bytes)))?
        };
        Ok((status, body))
    }

    /// Create a drink as the manager and return the id the store assigned.
    pub async fn seed(&self, title: &str, recipe: Value) -> Result<i64> {
        let (status, body) = self
            .send(
                Method::POST,
                "/drinks",
                Some(&token(MANAGER)),
                Some(json!({"title": title, "recipe": recipe})),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "seeding {} failed: {} {}", title, status, body);

        body["drinks"]
            .as_array()
            .and_then(|drinks| drinks.iter().find(|d| d["title"] == title))
            .and_then(|d| d["id"].as_i64())
            .context("seeded drink missing from response")
    }

    pub async fn stored_titles(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .all()
            .await?
            .into_iter()
            .map(|drink| drink.title)
            .collect())
    }
}
