use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AuthUser, Permission};
use crate::ledger::{NewProperty, TokenizeProperty, TokenizedProperty};
use crate::models::{Property, PropertyStatus, PropertyToken};
use crate::AppState;

use super::{ok, require, require_owner, ApiResult, DEFAULT_LIMIT, MAX_LIMIT};

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePropertyRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub valuation: Decimal,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizeRequest {
    pub total_supply: i64,
    pub token_price: Decimal,
    pub min_investment: Option<i64>,
    pub contract_address: Option<String>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<PropertyStatus>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDetail {
    pub property: Property,
    pub token: Option<PropertyToken>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /properties: register a draft property
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<CreatePropertyRequest>, JsonRejection>,
) -> ApiResult<Property> {
    require(&user, Permission::ManageProperties)?;
    let Json(body) = body?;

    let property = state
        .ledger
        .tokenization
        .create_property(NewProperty {
            title: body.title,
            description: body.description,
            location: body.location,
            valuation: body.valuation,
            created_by: user.user_id,
        })
        .await?;

    ok(property)
}

/// GET /properties: list properties, newest first
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<Property>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let properties = state
        .ledger
        .tokenization
        .list_properties(query.status, limit)
        .await?;

    ok(properties)
}

/// GET /properties/:id: property with its token, if tokenized
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PropertyDetail> {
    let property = state.ledger.tokenization.get_property(id).await?;
    let token = state.ledger.tokenization.token_for_property(id).await?;

    ok(PropertyDetail { property, token })
}

/// POST /properties/:id/tokenize: issue the property's token supply
pub async fn tokenize(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    body: Result<Json<TokenizeRequest>, JsonRejection>,
) -> ApiResult<TokenizedProperty> {
    require(&user, Permission::ManageProperties)?;
    let Json(body) = body?;

    let property = state.ledger.tokenization.get_property(id).await?;
    require_owner(&user, property.created_by, "property")?;

    let tokenized = state
        .ledger
        .tokenization
        .tokenize(TokenizeProperty {
            property_id: id,
            total_supply: body.total_supply,
            token_price: body.token_price,
            min_investment: body.min_investment.unwrap_or(1),
            contract_address: body.contract_address,
        })
        .await?;

    ok(tokenized)
}

/// GET /property-tokens/:id: token with its current available supply
pub async fn token(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PropertyToken> {
    let token = state.ledger.supply.get(id).await?;
    ok(token)
}
