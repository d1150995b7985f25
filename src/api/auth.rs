use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::verify_token;
use crate::errors::AppError;
use crate::AppState;

/// Bearer-token authentication middleware.
///
/// Every request must carry `Authorization: Bearer <jwt>` signed with
/// `JWT_SECRET`. The verified caller is attached as an `AuthUser` extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?;

    let user = verify_token(token, &state.config.jwt_secret).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        AppError::Unauthorized
    })?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
