//! Per-frame authentication and authorization.
//!
//! The gatekeeper sits between the transport layer and the gateway:
//! it authenticates the bearer credential once at the handshake and
//! authorizes every subsequent subscribe/send frame against the
//! destination policy table. Control frames are always permitted so a
//! client can always tear down cleanly.

use tracing::warn;
use uuid::Uuid;

use storegate_core::error::AppError;
use storegate_core::result::AppResult;

use crate::jwt::JwtCodec;
use crate::policy::PolicyTable;
use crate::role::Role;

/// Kind of inbound frame, for authorization purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Initial handshake.
    Connect,
    /// Topic/queue subscription request.
    Subscribe,
    /// Application message send.
    Send,
    /// Subscription removal.
    Unsubscribe,
    /// Liveness frame.
    Heartbeat,
    /// Connection teardown.
    Disconnect,
}

impl FrameKind {
    /// Control frames bypass the policy check entirely.
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Self::Connect | Self::Heartbeat | Self::Unsubscribe | Self::Disconnect
        )
    }
}

/// Authenticated identity attached to a live connection.
#[derive(Debug, Clone)]
pub struct Principal {
    /// User ID from the token subject.
    pub user_id: Uuid,
    /// Username.
    pub username: String,
    /// Role set resolved at authentication time.
    pub roles: Vec<Role>,
}

/// Authenticates handshakes and authorizes individual frames.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    codec: JwtCodec,
    policy: PolicyTable,
}

impl Gatekeeper {
    /// Creates a gatekeeper with the given token codec and policy table.
    pub fn new(codec: JwtCodec, policy: PolicyTable) -> Self {
        Self { codec, policy }
    }

    /// Authenticates the handshake credential.
    ///
    /// A missing or invalid token refuses the handshake; no session is
    /// ever registered before this succeeds.
    pub fn authenticate(&self, token: &str) -> AppResult<Principal> {
        if token.trim().is_empty() {
            return Err(AppError::connection_rejected("Missing bearer token"));
        }

        let claims = match self.codec.decode(token) {
            Ok(claims) => claims,
            Err(err) => {
                warn!(error = %err, "token validation failed");
                return Err(err);
            }
        };
        Ok(Principal {
            user_id: claims.sub,
            username: claims.username,
            roles: claims.roles,
        })
    }

    /// Authorizes one frame against the destination policy.
    ///
    /// Failure is scoped to the frame: the caller rejects the frame and
    /// keeps the session alive.
    pub fn authorize(
        &self,
        principal: &Principal,
        kind: FrameKind,
        destination: &str,
    ) -> AppResult<()> {
        if kind.is_control() {
            return Ok(());
        }

        if self.policy.is_allowed(destination, &principal.roles) {
            Ok(())
        } else {
            warn!(username = %principal.username, destination, "destination denied");
            Err(AppError::authorization_denied(format!(
                "Not authorized for destination: {destination}"
            )))
        }
    }

    /// Access to the underlying policy table.
    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storegate_core::config::auth::AuthConfig;
    use storegate_core::error::ErrorKind;

    fn gatekeeper() -> Gatekeeper {
        let codec = JwtCodec::new(&AuthConfig {
            jwt_secret: "gatekeeper-test".to_string(),
            jwt_access_ttl_minutes: 5,
            jwt_leeway_seconds: 5,
        });
        Gatekeeper::new(codec, PolicyTable::standard())
    }

    fn principal(roles: &[Role]) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            username: "test".to_string(),
            roles: roles.to_vec(),
        }
    }

    #[test]
    fn test_missing_token_rejects_handshake() {
        let err = gatekeeper().authenticate("").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConnectionRejected);
    }

    #[test]
    fn test_valid_token_yields_principal() {
        let gk = gatekeeper();
        let uid = Uuid::new_v4();
        let token = gk.codec.sign(uid, "carol", &[Role::Analyst]).unwrap();

        let p = gk.authenticate(&token).unwrap();
        assert_eq!(p.user_id, uid);
        assert_eq!(p.roles, vec![Role::Analyst]);
    }

    #[test]
    fn test_control_frames_are_always_permitted() {
        let gk = gatekeeper();
        let p = principal(&[]);
        for kind in [
            FrameKind::Connect,
            FrameKind::Heartbeat,
            FrameKind::Unsubscribe,
            FrameKind::Disconnect,
        ] {
            assert!(gk.authorize(&p, kind, "/topic/admin/anything").is_ok());
        }
    }

    #[test]
    fn test_subscribe_denied_is_scoped_per_frame() {
        let gk = gatekeeper();
        let p = principal(&[Role::Cashier]);

        assert!(
            gk.authorize(&p, FrameKind::Subscribe, "/topic/orders/updates")
                .is_ok()
        );
        let err = gk
            .authorize(&p, FrameKind::Subscribe, "/topic/admin/connections")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AuthorizationDenied);
    }

    #[test]
    fn test_send_default_deny() {
        let gk = gatekeeper();
        let p = principal(&[Role::Admin]);
        assert!(gk.authorize(&p, FrameKind::Send, "/nowhere").is_err());
    }
}
