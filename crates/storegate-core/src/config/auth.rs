//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// JWT signing and validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for access token signing/verification.
    #[serde(default = "default_secret")]
    pub jwt_secret: String,
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub jwt_access_ttl_minutes: u64,
    /// Clock-skew leeway for token validation, in seconds.
    #[serde(default = "default_leeway")]
    pub jwt_leeway_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_secret(),
            jwt_access_ttl_minutes: default_access_ttl(),
            jwt_leeway_seconds: default_leeway(),
        }
    }
}

fn default_secret() -> String {
    // Overridden in deployment via STOREGATE__AUTH__JWT_SECRET.
    "storegate-dev-secret-change-me".to_string()
}

fn default_access_ttl() -> u64 {
    30
}

fn default_leeway() -> u64 {
    5
}
