//! JWT access-token claims, signing, and validation.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use storegate_core::config::auth::AuthConfig;
use storegate_core::error::AppError;

use crate::role::Role;

/// JWT claims payload embedded in every access token.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    /// Subject — the user ID.
    pub sub: Uuid,
    /// Username for convenience.
    pub username: String,
    /// Role set at the time of token issuance.
    pub roles: Vec<Role>,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

impl Claims {
    /// Checks whether this token has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs and validates HS256 access tokens.
#[derive(Clone)]
pub struct JwtCodec {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
    /// Access token TTL in minutes.
    access_ttl_minutes: i64,
}

impl std::fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCodec")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtCodec {
    /// Creates a new codec from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.jwt_leeway_seconds;

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            access_ttl_minutes: config.jwt_access_ttl_minutes as i64,
        }
    }

    /// Signs an access token for the given identity.
    pub fn sign(&self, user_id: Uuid, username: &str, roles: &[Role]) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            roles: roles.to_vec(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::minutes(self.access_ttl_minutes)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode access token: {e}")))
    }

    /// Decodes and validates an access token string.
    ///
    /// Checks signature validity and expiration. Failures map to
    /// [`AppError::connection_rejected`] because token validation only
    /// happens at the handshake boundary.
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::connection_rejected("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::connection_rejected("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::connection_rejected("Invalid token signature")
                    }
                    _ => AppError::connection_rejected(format!("Token validation failed: {e}")),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storegate_core::error::ErrorKind;

    fn codec() -> JwtCodec {
        JwtCodec::new(&AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_access_ttl_minutes: 5,
            jwt_leeway_seconds: 5,
        })
    }

    #[test]
    fn test_sign_and_decode_round_trip() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let token = codec
            .sign(user_id, "alice", &[Role::Manager, Role::Analyst])
            .unwrap();

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.roles, vec![Role::Manager, Role::Analyst]);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_decode_garbage_is_rejected() {
        let err = codec().decode("not-a-token").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConnectionRejected);
    }

    #[test]
    fn test_decode_wrong_secret_is_rejected() {
        let token = codec().sign(Uuid::new_v4(), "bob", &[Role::Cashier]).unwrap();

        let other = JwtCodec::new(&AuthConfig {
            jwt_secret: "different-secret".to_string(),
            jwt_access_ttl_minutes: 5,
            jwt_leeway_seconds: 5,
        });
        let err = other.decode(&token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConnectionRejected);
    }
}
