use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::AuthGate;
use crate::error::ApiError;

/// Middleware state: the gate plus the scope one route demands.
#[derive(Clone)]
pub struct RequiredScope {
    gate: Arc<AuthGate>,
    scope: &'static str,
}

impl RequiredScope {
    pub fn new(gate: Arc<AuthGate>, scope: &'static str) -> Self {
        Self { gate, scope }
    }
}

/// Rejects the request unless its bearer token grants the route's scope.
/// On success the `ClaimsContext` is injected into request extensions.
pub async fn require_scope(
    State(required): State<RequiredScope>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();

    let context = match required.gate.authorize(&parts.headers, required.scope).await {
        Ok(context) => context,
        Err(err) => {
            // Never log the token itself
            tracing::warn!("Rejected {} {}: {}", parts.method, parts.uri.path(), err);
            return Err(err.into());
        }
    };

    tracing::debug!("Authorized {} for '{}'", context.subject(), required.scope);
    parts.extensions.insert(context);

    Ok(next.run(Request::from_parts(parts, body)).await)
}
