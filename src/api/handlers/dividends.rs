use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{AuthUser, Permission};
use crate::errors::AppError;
use crate::ledger::{DeclareDividend, Distribution};
use crate::models::{Dividend, DividendPayment};
use crate::AppState;

use super::{ok, require, require_owner, ApiResult};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclareDividendRequest {
    pub property_token_id: Uuid,
    pub amount: Decimal,
    /// Holdings purchased after this instant are not paid. Defaults to now.
    pub distribution_date: Option<DateTime<Utc>>,
}

/// Dividends are managed by whoever registered the underlying property.
async fn require_property_manager(
    state: &AppState,
    user: &AuthUser,
    token_id: Uuid,
) -> Result<(), AppError> {
    let token = state.ledger.supply.get(token_id).await?;
    let property = state.ledger.tokenization.get_property(token.property_id).await?;
    require_owner(user, property.created_by, "property")
}

/// POST /dividends: declare a dividend pool for a token
pub async fn declare(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<DeclareDividendRequest>, JsonRejection>,
) -> ApiResult<Dividend> {
    require(&user, Permission::DeclareDividends)?;
    let Json(body) = body?;
    require_property_manager(&state, &user, body.property_token_id).await?;

    let dividend = state
        .ledger
        .dividends
        .declare(DeclareDividend {
            property_token_id: body.property_token_id,
            amount: body.amount,
            distribution_date: body.distribution_date.unwrap_or_else(Utc::now),
            declared_by: user.user_id,
        })
        .await?;

    ok(dividend)
}

/// POST /dividends/:id/distribute: pay out a scheduled dividend
pub async fn distribute(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Distribution> {
    require(&user, Permission::DistributeDividends)?;

    let dividend = state.ledger.dividends.get(id).await?;
    require_property_manager(&state, &user, dividend.property_token_id).await?;

    let distribution = state.ledger.dividends.distribute(id).await?;
    ok(distribution)
}

/// POST /dividends/:id/cancel: withdraw a scheduled dividend
pub async fn cancel(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Dividend> {
    require(&user, Permission::DeclareDividends)?;

    let dividend = state.ledger.dividends.get(id).await?;
    require_property_manager(&state, &user, dividend.property_token_id).await?;

    let cancelled = state.ledger.dividends.cancel(id).await?;
    ok(cancelled)
}

/// GET /dividends/:id
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Dividend> {
    let dividend = state.ledger.dividends.get(id).await?;
    ok(dividend)
}

/// GET /dividends/:id/payments: the whole batch for the property's manager,
/// only the caller's own payments for anyone else
pub async fn payments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<DividendPayment>> {
    let dividend = state.ledger.dividends.get(id).await?;
    let payments = state.ledger.dividends.payments(id).await?;

    let manages = require_property_manager(&state, &user, dividend.property_token_id)
        .await
        .is_ok();
    let visible = if manages {
        payments
    } else {
        payments
            .into_iter()
            .filter(|p| p.user_id == user.user_id)
            .collect()
    };

    ok(visible)
}

/// GET /dividends/me/payments: every payment made to the caller
pub async fn my_payments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<DividendPayment>> {
    let payments = state.ledger.dividends.payments_for_user(user.user_id).await?;
    ok(payments)
}
