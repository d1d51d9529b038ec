use serde::{Deserialize, Serialize};

/// Scope that unlocks the administrative schedule status override.
pub const ADMIN_SCOPE: &str = "schedules:admin";

/// Access token payload. `sub` is the caregiver id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    #[serde(default)]
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    /// Space-separated, OAuth style.
    #[serde(default)]
    pub scope: String,
    /// Auth client id.
    #[serde(default)]
    pub cid: String,
    /// Caregiver display name.
    #[serde(default)]
    pub cname: String,
}

impl AccessClaims {
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.split_whitespace()
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().any(|s| s == scope)
    }
}

/// Identity token payload, signed with its own secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdClaims {
    pub iss: String,
    pub sub: String,
    pub aud: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub name: String,
    pub email: String,
    pub scope: String,
    pub cid: String,
}
