//! Session identity and the role/permission model.
//!
//! The auth provider issues HS256 bearer tokens carrying `(sub, role, exp)`;
//! this module only verifies them and answers capability questions.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Roles & permissions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Investor,
    PropertyManager,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Primary-market purchases and cancelling own investments.
    Invest,
    /// Placing and cancelling own order-book orders.
    Trade,
    /// Creating and tokenizing own properties.
    ManageProperties,
    DeclareDividends,
    DistributeDividends,
    /// Acting on properties, orders and investments owned by others.
    ManageAnyResource,
}

impl Role {
    pub fn permissions(self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Investor => &[Invest, Trade],
            Role::PropertyManager => &[
                Invest,
                Trade,
                ManageProperties,
                DeclareDividends,
                DistributeDividends,
            ],
            Role::Admin => &[
                Invest,
                Trade,
                ManageProperties,
                DeclareDividends,
                DistributeDividends,
                ManageAnyResource,
            ],
        }
    }

    pub fn can(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

/// The verified caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn can(&self, permission: Permission) -> bool {
        self.role.can(permission)
    }

    /// Whether the caller may act on a resource owned by `owner`.
    pub fn owns_or_manages(&self, owner: Uuid) -> bool {
        self.user_id == owner || self.can(Permission::ManageAnyResource)
    }
}

/// Issue a session token valid for `ttl`.
pub fn issue_token(
    user_id: Uuid,
    role: Role,
    secret: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (Utc::now() + ttl).timestamp().max(0) as usize;
    let claims = Claims {
        sub: user_id,
        role,
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify signature and expiry of a session token.
pub fn verify_token(token: &str, secret: &str) -> Result<AuthUser, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(AuthUser {
        user_id: data.claims.sub,
        role: data.claims.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_investor_cannot_manage_properties() {
        assert!(Role::Investor.can(Permission::Invest));
        assert!(Role::Investor.can(Permission::Trade));
        assert!(!Role::Investor.can(Permission::ManageProperties));
        assert!(!Role::Investor.can(Permission::DistributeDividends));
    }

    #[test]
    fn test_only_admin_manages_other_users_resources() {
        assert!(!Role::PropertyManager.can(Permission::ManageAnyResource));
        assert!(Role::Admin.can(Permission::ManageAnyResource));

        let owner = Uuid::new_v4();
        let manager = AuthUser { user_id: Uuid::new_v4(), role: Role::PropertyManager };
        let admin = AuthUser { user_id: Uuid::new_v4(), role: Role::Admin };
        assert!(!manager.owns_or_manages(owner));
        assert!(admin.owns_or_manages(owner));
        assert!(AuthUser { user_id: owner, role: Role::Investor }.owns_or_manages(owner));
    }

    #[test]
    fn test_token_round_trip() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, Role::PropertyManager, SECRET, Duration::hours(1)).unwrap();
        let user = verify_token(&token, SECRET).unwrap();
        assert_eq!(user, AuthUser { user_id, role: Role::PropertyManager });
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue_token(Uuid::new_v4(), Role::Investor, SECRET, Duration::hours(1)).unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = issue_token(Uuid::new_v4(), Role::Investor, SECRET, Duration::hours(-2)).unwrap();
        assert!(verify_token(&token, SECRET).is_err());
    }
}
