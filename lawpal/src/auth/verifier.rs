//! HS256 token verification.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Session;

/// Prefix every `Authorization` header value must carry.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Secret used when `JWT_SECRET` is unset. Never use this outside local development.
pub const INSECURE_FALLBACK_SECRET: &str = "fallback-secret-key";

/// Why a credential was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingCredential,
    #[error("Invalid or expired token")]
    InvalidCredential,
}

/// Claims carried by an accepted token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Expiry as seconds since the epoch; checked when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// Verifies bearer tokens against a server-held secret.
pub struct TokenVerifier {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Tokens without `exp` are accepted; `exp` is still enforced when present.
        validation.required_spec_claims.clear();
        // No audience is configured, so an `aud` claim is ignored rather than rejected.
        validation.validate_aud = false;
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Check an `Authorization` header value and produce the caller's session.
    pub fn verify_header(&self, header: Option<&str>) -> Result<Session, AuthError> {
        let token = header
            .and_then(|h| h.strip_prefix(BEARER_PREFIX))
            .ok_or(AuthError::MissingCredential)?;
        let claims = self.verify(token)?;
        Ok(Session::new(claims.user_id, token))
    }

    /// Check a bare token (signature, structure, expiry).
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token verification failed");
                AuthError::InvalidCredential
            })
    }

    /// Sign a token for `user_id`, valid for `ttl` if given.
    pub fn issue(&self, user_id: &str, ttl: Option<chrono::Duration>) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            user_id: user_id.to_string(),
            exp: ttl.map(|ttl| (now + ttl).timestamp()),
            iat: Some(now.timestamp()),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn bearer(token: &str) -> String {
        format!("{BEARER_PREFIX}{token}")
    }

    #[test]
    fn accepts_valid_token() {
        let verifier = TokenVerifier::new(SECRET);
        let token = verifier.issue("u1", Some(chrono::Duration::hours(1))).unwrap();

        let session = verifier.verify_header(Some(&bearer(&token))).unwrap();
        assert_eq!(session.user_id, "u1");
        assert_eq!(session.token, token);
    }

    #[test]
    fn accepts_token_without_expiry() {
        let verifier = TokenVerifier::new(SECRET);
        let token = verifier.issue("u2", None).unwrap();
        assert_eq!(verifier.verify(&token).unwrap().user_id, "u2");
    }

    #[test]
    fn missing_or_unprefixed_header_is_missing_credential() {
        let verifier = TokenVerifier::new(SECRET);
        let token = verifier.issue("u1", None).unwrap();

        assert_eq!(verifier.verify_header(None), Err(AuthError::MissingCredential));
        assert_eq!(verifier.verify_header(Some(&token)), Err(AuthError::MissingCredential));
        assert_eq!(
            verifier.verify_header(Some(&format!("Basic {token}"))),
            Err(AuthError::MissingCredential)
        );
    }

    #[test]
    fn tampered_token_is_invalid() {
        let verifier = TokenVerifier::new(SECRET);
        let token = verifier.issue("u1", None).unwrap();
        let (signed, signature) = token.rsplit_once('.').unwrap();
        let mut signature: Vec<char> = signature.chars().collect();
        signature[10] = if signature[10] == 'A' { 'B' } else { 'A' };
        let tampered = format!("{signed}.{}", signature.into_iter().collect::<String>());

        assert_eq!(
            verifier.verify_header(Some(&bearer(&tampered))),
            Err(AuthError::InvalidCredential)
        );
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let other = TokenVerifier::new("someone-else");
        let token = other.issue("u1", None).unwrap();
        let verifier = TokenVerifier::new(SECRET);
        assert_eq!(verifier.verify(&token), Err(AuthError::InvalidCredential));
    }

    #[test]
    fn expired_token_is_invalid() {
        let verifier = TokenVerifier::new(SECRET);
        let token = verifier.issue("u1", Some(chrono::Duration::hours(-2))).unwrap();
        assert_eq!(verifier.verify(&token), Err(AuthError::InvalidCredential));
    }

    #[test]
    fn audience_claim_is_ignored() {
        let verifier = TokenVerifier::new(SECRET);
        let claims = serde_json::json!({ "userId": "u1", "aud": "lawpal-web" });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let session = verifier.verify_header(Some(&bearer(&token))).unwrap();
        assert_eq!(session.user_id, "u1");
    }

    #[test]
    fn garbage_is_invalid() {
        let verifier = TokenVerifier::new(SECRET);
        assert_eq!(
            verifier.verify_header(Some("Bearer not.a.jwt")),
            Err(AuthError::InvalidCredential)
        );
        assert_eq!(verifier.verify_header(Some("Bearer ")), Err(AuthError::InvalidCredential));
    }
}
