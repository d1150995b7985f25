pub mod dividends;
pub mod health;
pub mod investments;
pub mod metrics;
pub mod order_book;
pub mod properties;
pub mod transactions;

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthUser, Permission};
use crate::errors::AppError;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    }))
}

/// `?limit=` for list endpoints, clamped to `1..=MAX_LIMIT`.
#[derive(Debug, Default, Deserialize)]
pub struct Paging {
    pub limit: Option<i64>,
}

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 500;

impl Paging {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

pub(crate) fn require(user: &AuthUser, permission: Permission) -> Result<(), AppError> {
    if user.can(permission) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("role lacks {permission:?} permission")))
    }
}

/// The caller must own the resource or hold `ManageAnyResource`.
pub(crate) fn require_owner(user: &AuthUser, owner: uuid::Uuid, what: &str) -> Result<(), AppError> {
    if user.owns_or_manages(owner) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("{what} belongs to another user")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use uuid::Uuid;

    #[test]
    fn test_paging_clamps() {
        assert_eq!(Paging::default().limit(), DEFAULT_LIMIT);
        assert_eq!(Paging { limit: Some(0) }.limit(), 1);
        assert_eq!(Paging { limit: Some(10_000) }.limit(), MAX_LIMIT);
    }

    #[test]
    fn test_require_permission() {
        let investor = AuthUser { user_id: Uuid::new_v4(), role: Role::Investor };
        assert!(require(&investor, Permission::Trade).is_ok());
        assert!(matches!(
            require(&investor, Permission::DeclareDividends),
            Err(AppError::Forbidden(_))
        ));
    }
}
