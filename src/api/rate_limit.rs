use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use metrics::counter;

use crate::auth::AuthUser;
use crate::db::rate_limit_repo;
use crate::errors::AppError;
use crate::AppState;

/// Fixed one-minute window per user for mutating requests, counted in
/// Postgres so every instance shares the same budget. Runs after
/// `require_auth`. A storage failure lets the request through.
pub async fn limit_mutations(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let limit = state.config.rate_limit_per_minute;
    if limit == 0 || !is_mutating(req.method()) {
        return Ok(next.run(req).await);
    }

    let Some(user) = req.extensions().get::<AuthUser>().copied() else {
        return Ok(next.run(req).await);
    };

    let key = format!("user:{}", user.user_id);
    match rate_limit_repo::hit(&state.db, &key).await {
        Ok(hits) if i64::from(hits) > i64::from(limit) => {
            counter!("rate_limited_requests_total").increment(1);
            tracing::warn!(user_id = %user.user_id, hits, limit, "Rate limit exceeded");
            Err(AppError::RateLimited)
        }
        Ok(_) => Ok(next.run(req).await),
        Err(e) => {
            tracing::warn!(error = %e, "Rate limit check failed, allowing request");
            Ok(next.run(req).await)
        }
    }
}

fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_writes_are_limited() {
        assert!(is_mutating(&Method::POST));
        assert!(is_mutating(&Method::PATCH));
        assert!(!is_mutating(&Method::GET));
        assert!(!is_mutating(&Method::OPTIONS));
    }
}
