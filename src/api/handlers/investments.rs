use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{AuthUser, Permission};
use crate::models::{Holding, Investment};
use crate::AppState;

use super::{ok, require, require_owner, ApiResult};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInvestmentRequest {
    pub property_token_id: Uuid,
    pub token_amount: i64,
    /// Defaults to the token's issue price; any other value is rejected.
    pub price_per_token: Option<Decimal>,
}

/// POST /investments: primary-market purchase
pub async fn record(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<RecordInvestmentRequest>, JsonRejection>,
) -> ApiResult<Investment> {
    require(&user, Permission::Invest)?;
    let Json(body) = body?;

    let price = match body.price_per_token {
        Some(price) => price,
        None => state.ledger.supply.get(body.property_token_id).await?.token_price,
    };

    let investment = state
        .ledger
        .investments
        .record_investment(user.user_id, body.property_token_id, body.token_amount, price)
        .await?;

    ok(investment)
}

/// POST /investments/:id/cancel: return an investment's tokens to supply
pub async fn cancel(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Investment> {
    require(&user, Permission::Invest)?;

    let investment = state.ledger.investments.get(id).await?;
    require_owner(&user, investment.user_id, "investment")?;

    let cancelled = state.ledger.investments.cancel_investment(id).await?;
    ok(cancelled)
}

/// GET /investments/me: caller's investments, newest first
pub async fn mine(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<Investment>> {
    let investments = state.ledger.investments.list_for_user(user.user_id).await?;
    ok(investments)
}

/// GET /investments/me/holdings: caller's net active tokens per token
pub async fn holdings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<Holding>> {
    let holdings = state.ledger.investments.holdings(user.user_id).await?;
    ok(holdings)
}
