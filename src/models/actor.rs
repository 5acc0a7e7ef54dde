//! Authenticated actor claims and capability checks

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// JWT claims for an authenticated actor.
///
/// Identity management lives elsewhere; this server only consumes the token.
/// Every lifecycle query and command starts from one of the capability
/// checks below, regardless of transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorClaims {
    pub sub: String,
    pub user_id: i32,
    /// Staff may see and manage every user's borrowings and payments
    pub staff: bool,
    pub exp: i64,
    pub iat: i64,
}

impl ActorClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_staff(&self) -> bool {
        self.staff
    }

    /// Whether this actor may see a resource owned by `owner_id`
    pub fn can_access(&self, owner_id: i32) -> bool {
        self.staff || self.user_id == owner_id
    }

    /// Require staff privileges
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.staff {
            Ok(())
        } else {
            Err(AppError::Authorization("Staff privileges required".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(user_id: i32, staff: bool) -> ActorClaims {
        ActorClaims {
            sub: format!("user-{}", user_id),
            user_id,
            staff,
            exp: 4_102_444_800, // 2100-01-01
            iat: 0,
        }
    }

    #[test]
    fn test_owner_access() {
        let actor = claims(42, false);
        assert!(actor.can_access(42));
        assert!(!actor.can_access(43));
        assert!(actor.require_staff().is_err());
    }

    #[test]
    fn test_staff_access() {
        let actor = claims(1, true);
        assert!(actor.can_access(999));
        assert!(actor.require_staff().is_ok());
    }

    #[test]
    fn test_token_round_trip() {
        let actor = claims(7, true);
        let token = actor.create_token("test-secret").unwrap();
        let parsed = ActorClaims::from_token(&token, "test-secret").unwrap();
        assert_eq!(parsed.user_id, 7);
        assert!(parsed.staff);
        // Wrong secret must not validate
        assert!(ActorClaims::from_token(&token, "other-secret").is_err());
    }
}
