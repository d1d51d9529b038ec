use std::sync::Arc;

use caretrack_core::clock::Clock;
use caretrack_core::config::AuthConfig;
use caretrack_core::types::Caregiver;
use caretrack_core::{CareError, Result};
use caretrack_store::{AuthClientStore, CaregiverStore};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::claims::{AccessClaims, IdClaims};
use crate::secret::verify_secret;

pub const CLIENT_CREDENTIALS: &str = "client_credentials";

/// Client-credentials grant input, already merged from body and Basic auth.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub grant_type: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub scope: String,
    pub id_token: String,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub tokens: TokenPair,
    pub caregiver: Caregiver,
}

/// Issues and verifies HS256 tokens for caregiver-bound auth clients.
pub struct AuthService {
    clients: Arc<dyn AuthClientStore>,
    caregivers: Arc<dyn CaregiverStore>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(
        clients: Arc<dyn AuthClientStore>,
        caregivers: Arc<dyn CaregiverStore>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        Self {
            clients,
            caregivers,
            clock,
            config,
        }
    }

    #[instrument(skip(self, req), fields(client_id = %req.client_id))]
    pub async fn issue_token(&self, req: TokenRequest) -> Result<IssuedToken> {
        if !req.grant_type.trim().eq_ignore_ascii_case(CLIENT_CREDENTIALS) {
            return Err(CareError::validation("unsupported grant_type"));
        }
        if req.client_id.is_empty() || req.client_secret.is_empty() {
            return Err(CareError::unauthorized("client credentials are required"));
        }

        let Some(client) = self.clients.find(&req.client_id).await? else {
            warn!("unknown auth client");
            return Err(CareError::unauthorized("invalid client credentials"));
        };
        if !verify_secret(&client.secret_hash, &req.client_secret) {
            warn!("client secret mismatch");
            return Err(CareError::unauthorized("invalid client credentials"));
        }

        let scope = match req.scope.as_deref().map(str::trim) {
            Some(requested) if !requested.is_empty() => {
                if let Some(denied) = requested
                    .split_whitespace()
                    .find(|s| !client.scopes.iter().any(|granted| granted == s))
                {
                    return Err(CareError::validation(format!("scope not permitted: {denied}")));
                }
                requested.split_whitespace().collect::<Vec<_>>().join(" ")
            }
            _ => client.scopes.join(" "),
        };

        let caregiver = self.caregivers.get(&client.caregiver_id).await?;

        let now = self.clock.now().timestamp();
        let access = AccessClaims {
            iss: self.config.issuer.clone(),
            sub: caregiver.id.clone(),
            aud: self.config.audience.clone(),
            iat: now,
            exp: now + ttl(self.config.access_token_ttl_secs),
            scope: scope.clone(),
            cid: client.id.clone(),
            cname: caregiver.name.clone(),
        };
        let id = IdClaims {
            iss: self.config.issuer.clone(),
            sub: caregiver.id.clone(),
            aud: vec![self.config.audience.clone()],
            iat: now,
            exp: now + ttl(self.config.id_token_ttl_secs),
            name: caregiver.name.clone(),
            email: caregiver.email.clone(),
            scope: scope.clone(),
            cid: client.id.clone(),
        };

        let access_token = sign(&access, &self.config.access_token_secret)?;
        let id_token = sign(&id, &self.config.id_token_secret)?;
        info!(caregiver_id = %caregiver.id, %scope, "token issued");

        Ok(IssuedToken {
            tokens: TokenPair {
                access_token,
                token_type: "Bearer".to_string(),
                expires_in: self.config.access_token_ttl_secs,
                scope,
                id_token,
            },
            caregiver,
        })
    }

    /// Validate a bearer access token. Expiry is judged against the injected
    /// clock, not the wall clock.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CareError::unauthorized("missing bearer token"));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.set_audience(&[self.config.audience.as_str()]);
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.config.access_token_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            debug!(error = %e, "access token rejected");
            CareError::unauthorized("invalid token")
        })?;

        let claims = data.claims;
        if claims.exp <= self.clock.now().timestamp() {
            return Err(CareError::unauthorized("token expired"));
        }
        if claims.sub.is_empty() {
            return Err(CareError::unauthorized("token has no subject"));
        }
        Ok(claims)
    }
}

fn ttl(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX / 2)
}

fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| CareError::Internal(format!("token signing failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use caretrack_core::clock::FixedClock;
    use caretrack_core::types::AuthClient;
    use caretrack_store::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};
    use sha2::{Digest, Sha256};

    struct Fixture {
        auth: AuthService,
        clock: Arc<FixedClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_caregiver(Caregiver {
                id: "cg-1".into(),
                name: "Dana Carer".into(),
                email: "dana@example.com".into(),
            })
            .unwrap();
        store
            .insert_auth_client(AuthClient {
                id: "mobile".into(),
                secret_hash: hex::encode(Sha256::digest(b"s3cret")),
                description: "mobile app".into(),
                caregiver_id: "cg-1".into(),
                scopes: vec!["schedules:read".into(), "schedules:write".into()],
            })
            .unwrap();
        store
            .insert_auth_client(AuthClient {
                id: "orphan".into(),
                secret_hash: hex::encode(Sha256::digest(b"s3cret")),
                description: String::new(),
                caregiver_id: "cg-missing".into(),
                scopes: Vec::new(),
            })
            .unwrap();
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap(),
        ));
        Fixture {
            auth: AuthService::new(store.clone(), store, clock.clone(), AuthConfig::default()),
            clock,
        }
    }

    fn request(client_id: &str, secret: &str) -> TokenRequest {
        TokenRequest {
            grant_type: "client_credentials".into(),
            client_id: client_id.into(),
            client_secret: secret.into(),
            scope: None,
        }
    }

    #[tokio::test]
    async fn issued_access_token_verifies() {
        let fx = fixture();
        let issued = fx.auth.issue_token(request("mobile", "s3cret")).await.unwrap();
        assert_eq!(issued.tokens.token_type, "Bearer");
        assert_eq!(issued.tokens.expires_in, 900);
        assert_eq!(issued.tokens.scope, "schedules:read schedules:write");
        assert_eq!(issued.caregiver.id, "cg-1");

        let claims = fx.auth.verify_access_token(&issued.tokens.access_token).unwrap();
        assert_eq!(claims.sub, "cg-1");
        assert_eq!(claims.cid, "mobile");
        assert_eq!(claims.cname, "Dana Carer");
        assert!(claims.has_scope("schedules:write"));
    }

    #[tokio::test]
    async fn id_token_is_not_an_access_token() {
        let fx = fixture();
        let issued = fx.auth.issue_token(request("mobile", "s3cret")).await.unwrap();
        let err = fx.auth.verify_access_token(&issued.tokens.id_token).unwrap_err();
        assert!(matches!(err, CareError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn grant_type_is_case_insensitive_and_checked() {
        let fx = fixture();
        let mut req = request("mobile", "s3cret");
        req.grant_type = "Client_Credentials".into();
        assert!(fx.auth.issue_token(req.clone()).await.is_ok());

        req.grant_type = "password".into();
        let err = fx.auth.issue_token(req).await.unwrap_err();
        assert!(matches!(err, CareError::Validation(_)));
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized() {
        let fx = fixture();
        for (id, secret) in [("mobile", "wrong"), ("nobody", "s3cret"), ("mobile", "")] {
            let err = fx.auth.issue_token(request(id, secret)).await.unwrap_err();
            assert!(matches!(err, CareError::Unauthorized(_)), "{id}/{secret}");
        }
    }

    #[tokio::test]
    async fn client_without_caregiver_is_not_found() {
        let fx = fixture();
        let err = fx.auth.issue_token(request("orphan", "s3cret")).await.unwrap_err();
        assert!(matches!(err, CareError::NotFound));
    }

    #[tokio::test]
    async fn requested_scope_must_be_granted() {
        let fx = fixture();
        let mut req = request("mobile", "s3cret");
        req.scope = Some(" schedules:read ".into());
        let issued = fx.auth.issue_token(req.clone()).await.unwrap();
        assert_eq!(issued.tokens.scope, "schedules:read");

        req.scope = Some("schedules:read schedules:admin".into());
        let err = fx.auth.issue_token(req).await.unwrap_err();
        assert!(matches!(err, CareError::Validation(_)));
    }

    #[tokio::test]
    async fn token_expires_on_the_injected_clock() {
        let fx = fixture();
        let issued = fx.auth.issue_token(request("mobile", "s3cret")).await.unwrap();
        fx.clock.advance(Duration::seconds(899));
        assert!(fx.auth.verify_access_token(&issued.tokens.access_token).is_ok());
        fx.clock.advance(Duration::seconds(1));
        let err = fx.auth.verify_access_token(&issued.tokens.access_token).unwrap_err();
        assert!(matches!(err, CareError::Unauthorized(_)));
    }

    #[test]
    fn foreign_and_empty_tokens_are_rejected() {
        let fx = fixture();
        let forged = sign(
            &AccessClaims {
                iss: "caretrack".into(),
                sub: "cg-1".into(),
                aud: "caretrack-api".into(),
                iat: 0,
                exp: i64::MAX / 2,
                scope: String::new(),
                cid: String::new(),
                cname: String::new(),
            },
            "some-other-secret",
        )
        .unwrap();
        for token in ["", "   ", "not.a.jwt", forged.as_str()] {
            let err = fx.auth.verify_access_token(token).unwrap_err();
            assert!(matches!(err, CareError::Unauthorized(_)), "{token}");
        }
    }

    #[test]
    fn missing_subject_is_rejected() {
        let fx = fixture();
        let token = sign(
            &AccessClaims {
                iss: "caretrack".into(),
                sub: String::new(),
                aud: "caretrack-api".into(),
                iat: 0,
                exp: i64::MAX / 2,
                scope: String::new(),
                cid: String::new(),
                cname: String::new(),
            },
            &AuthConfig::default().access_token_secret,
        )
        .unwrap();
        let err = fx.auth.verify_access_token(&token).unwrap_err();
        assert!(matches!(err, CareError::Unauthorized(_)));
    }
}
