use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::Transaction;
use crate::AppState;

use super::{ok, ApiResult, DEFAULT_LIMIT, MAX_LIMIT};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeQuery {
    pub property_token_id: Uuid,
    pub limit: Option<i64>,
}

/// GET /transactions?propertyTokenId=: executed fills, newest first
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<TradeQuery>, QueryRejection>,
) -> ApiResult<Vec<Transaction>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let transactions = state
        .ledger
        .orders
        .transactions(query.property_token_id, limit)
        .await?;
    ok(transactions)
}
