use std::str::FromStr;
use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use url::Url;

use super::claims::{Claims, ClaimsContext};
use super::jwks::{KeySource, RemoteKeySet};
use super::AuthError;
use crate::config::AuthConfig;

const UNPARSABLE: &str = "Unable to parse authentication token.";

/// Verifies bearer tokens against trusted keys and checks required scopes.
pub struct AuthGate {
    keys: KeySource,
    validation: Validation,
}

impl AuthGate {
    pub fn new(keys: KeySource, algorithm: Algorithm, audience: &str, issuer: &str, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.set_audience(&[audience]);
        validation.set_issuer(&[issuer]);
        validation.leeway = leeway_secs;
        validation.validate_nbf = true;

        Self { keys, validation }
    }

    /// Build a gate from configuration. Inline keys take precedence over a
    /// remote key set; issuer and key URL default to the Auth0 layout under
    /// `domain`.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let algorithm = Algorithm::from_str(&config.algorithm).map_err(|_| {
            AuthError::Configuration(format!("unsupported signing algorithm '{}'", config.algorithm))
        })?;
        let domain = config
            .domain
            .as_deref()
            .map(|d| d.trim_start_matches("https://").trim_end_matches('/'))
            .filter(|d| !d.is_empty());

        let issuer = match (&config.issuer, domain) {
            (Some(issuer), _) => issuer.clone(),
            (None, Some(domain)) => format!("https://{}/", domain),
            (None, None) => {
                return Err(AuthError::Configuration(
                    "AUTH_DOMAIN or AUTH_ISSUER must be set".to_string(),
                ))
            }
        };

        let keys = match (&config.jwks_json, &config.jwks_url, domain) {
            (Some(json), _, _) => {
                let set: JwkSet = serde_json::from_str(json)
                    .map_err(|e| AuthError::Configuration(format!("invalid AUTH_JWKS_JSON: {}", e)))?;
                KeySource::Static(set)
            }
            (None, Some(url), _) => KeySource::Remote(remote(url, config.jwks_cache_ttl_secs)?),
            (None, None, Some(domain)) => {
                let url = format!("https://{}/.well-known/jwks.json", domain);
                KeySource::Remote(remote(&url, config.jwks_cache_ttl_secs)?)
            }
            (None, None, None) => {
                return Err(AuthError::Configuration(
                    "no signing keys configured: set AUTH_JWKS_JSON, AUTH_JWKS_URL or AUTH_DOMAIN"
                        .to_string(),
                ))
            }
        };

        Ok(Self::new(keys, algorithm, &config.audience, &issuer, config.leeway_secs))
    }

    /// Verify the request's bearer token and require `required_scope` in its
    /// permission set.
    pub async fn authorize(&self, headers: &HeaderMap, required_scope: &str) -> Result<ClaimsContext, AuthError> {
        let token = extract_bearer_token(headers)?;
        let claims = self.verify(token).await?;

        let permissions = claims.permission_set().ok_or(AuthError::MissingPermissions)?;
        let context = ClaimsContext { permissions, claims };
        if !context.has(required_scope) {
            return Err(AuthError::InsufficientScope(required_scope.to_string()));
        }

        Ok(context)
    }

    /// Check signature, expiry, audience and issuer; returns the payload.
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::InvalidToken(UNPARSABLE))?;
        let kid = header
            .kid
            .ok_or(AuthError::InvalidToken("Authorization malformed."))?;
        let key = self.keys.decoding_key(&kid).await?;

        let data = decode::<Claims>(token, &key, &self.validation).map_err(classify)?;
        Ok(data.claims)
    }
}

fn remote(url: &str, ttl_secs: u64) -> Result<RemoteKeySet, AuthError> {
    let url = Url::parse(url)
        .map_err(|e| AuthError::Configuration(format!("invalid JWKS URL '{}': {}", url, e)))?;
    RemoteKeySet::new(url, Duration::from_secs(ttl_secs))
}

fn classify(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidAudience | ErrorKind::InvalidIssuer => AuthError::InvalidClaims,
        ErrorKind::MissingRequiredClaim(claim) if claim == "aud" || claim == "iss" => {
            AuthError::InvalidClaims
        }
        _ => AuthError::InvalidToken(UNPARSABLE),
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;
    let value = value
        .to_str()
        .map_err(|_| AuthError::MalformedHeader("Authorization header must be bearer token."))?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), _, _) if !scheme.eq_ignore_ascii_case("bearer") => Err(
            AuthError::MalformedHeader("Authorization header must start with \"Bearer\"."),
        ),
        (None, _, _) => Err(AuthError::MalformedHeader(
            "Authorization header must start with \"Bearer\".",
        )),
        (Some(_), None, _) => Err(AuthError::MalformedHeader("Token not found.")),
        (Some(_), Some(_), Some(_)) => Err(AuthError::MalformedHeader(
            "Authorization header must be bearer token.",
        )),
        (Some(_), Some(token), None) => Ok(token),
    }
}
