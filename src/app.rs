use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, Uri,
    },
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::AuthGate;
use crate::config::AppConfig;
use crate::database::DrinkStore;
use crate::error::ApiError;
use crate::handlers::{drinks, health};
use crate::middleware::{require_scope, RequiredScope};

/// Everything handlers need, passed through axum state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DrinkStore>,
    pub gate: Arc<AuthGate>,
}

impl AppState {
    pub fn new(store: Arc<dyn DrinkStore>, gate: Arc<AuthGate>) -> Self {
        Self { store, gate }
    }
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    let gate = state.gate.clone();
    let guard = |scope: &'static str| {
        middleware::from_fn_with_state(RequiredScope::new(gate.clone(), scope), require_scope)
    };

    Router::new()
        .route(
            "/drinks",
            get(drinks::list)
                .merge(post(drinks::create).route_layer(guard("post:drinks")))
                .fallback(method_not_allowed),
        )
        .route(
            "/drinks-detail",
            get(drinks::list_detail)
                .route_layer(guard("get:drinks-detail"))
                .fallback(method_not_allowed),
        )
        .route(
            "/drinks/:id",
            patch(drinks::update)
                .route_layer(guard("patch:drinks"))
                .merge(delete(drinks::delete).route_layer(guard("delete:drinks")))
                .fallback(method_not_allowed),
        )
        .route("/health", get(health::health).fallback(method_not_allowed))
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.server.max_request_size_bytes))
        .layer(cors_layer(&config.security.cors_origins))
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> ApiError {
    ApiError::not_found("no such route")
}

// Known path, unsupported method
async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::method_not_allowed(format!("{} {}", method, uri.path()))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
