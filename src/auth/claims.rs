use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Verified token payload.
///
/// Only the fields the API reads are typed; everything else the issuer put
/// in the token is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// List-valued permissions (Auth0 RBAC).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    /// Space-delimited OAuth scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Permission set granted by this token, `None` when the token carries
    /// neither a `permissions` nor a `scope` claim.
    pub fn permission_set(&self) -> Option<BTreeSet<String>> {
        if let Some(permissions) = &self.permissions {
            return Some(permissions.iter().cloned().collect());
        }
        self.scope
            .as_ref()
            .map(|scope| scope.split_whitespace().map(str::to_string).collect())
    }
}

/// Request-scoped result of a successful authorization, handed to handlers
/// through request extensions.
#[derive(Debug, Clone)]
pub struct ClaimsContext {
    pub permissions: BTreeSet<String>,
    pub claims: Claims,
}

impl ClaimsContext {
    pub fn has(&self, scope: &str) -> bool {
        self.permissions.contains(scope)
    }

    pub fn subject(&self) -> &str {
        self.claims.sub.as_deref().unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> Claims {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn permissions_list_wins_over_scope() {
        let c = claims(json!({
            "sub": "auth0|barista",
            "permissions": ["get:drinks-detail"],
            "scope": "openid profile"
        }));
        let set = c.permission_set().unwrap();
        assert!(set.contains("get:drinks-detail"));
        assert!(!set.contains("openid"));
    }

    #[test]
    fn scope_string_is_split_on_whitespace() {
        let c = claims(json!({"scope": "post:drinks  patch:drinks"}));
        let set = c.permission_set().unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("patch:drinks"));
    }

    #[test]
    fn no_permission_claims_yields_none() {
        let c = claims(json!({"sub": "someone", "aud": "drinks"}));
        assert!(c.permission_set().is_none());
        assert_eq!(c.extra.get("aud"), Some(&json!("drinks")));
    }

    #[test]
    fn empty_permissions_list_is_present_but_empty() {
        let c = claims(json!({"permissions": []}));
        assert!(c.permission_set().unwrap().is_empty());
    }
}
