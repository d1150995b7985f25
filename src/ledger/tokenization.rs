use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{property_repo, token_repo};
use crate::models::{Property, PropertyStatus, PropertyToken};

use super::{
    ensure_currency_amount, ensure_notional_fits, ensure_positive_amount, ensure_valid_price,
    LedgerError,
};

#[derive(Debug, Clone)]
pub struct NewProperty {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub valuation: Decimal,
    pub created_by: Uuid,
}

#[derive(Debug, Clone)]
pub struct TokenizeProperty {
    pub property_id: Uuid,
    pub total_supply: i64,
    pub token_price: Decimal,
    pub min_investment: i64,
    pub contract_address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizedProperty {
    pub property: Property,
    pub token: PropertyToken,
}

/// Property registration and the one-time draft -> tokenized transition.
#[derive(Clone)]
pub struct Tokenization {
    pool: PgPool,
}

impl Tokenization {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_property(&self, request: NewProperty) -> Result<Property, LedgerError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(LedgerError::Validation("title must not be empty".into()));
        }
        ensure_currency_amount("valuation", request.valuation)?;

        let property = property_repo::insert_property(
            &self.pool,
            title,
            request.description.as_deref(),
            request.location.as_deref(),
            request.valuation,
            request.created_by,
        )
        .await?;

        tracing::info!(property_id = %property.id, created_by = %property.created_by, "Property created");
        Ok(property)
    }

    /// Create the property's token with the whole supply available.
    pub async fn tokenize(&self, request: TokenizeProperty) -> Result<TokenizedProperty, LedgerError> {
        ensure_positive_amount(request.total_supply)?;
        ensure_valid_price(request.token_price)?;
        ensure_notional_fits(request.total_supply, request.token_price)?;
        if request.min_investment < 1 || request.min_investment > request.total_supply {
            return Err(LedgerError::Validation(format!(
                "minInvestment must be between 1 and {}",
                request.total_supply
            )));
        }

        let mut tx = self.pool.begin().await?;
        let property = property_repo::get_property_for_update(&mut tx, request.property_id)
            .await?
            .ok_or(LedgerError::NotFound("property"))?;
        if property.status != PropertyStatus::Draft {
            return Err(LedgerError::InvalidState(format!("property is {}", property.status)));
        }

        let token = token_repo::insert_token(
            &mut tx,
            property.id,
            request.total_supply,
            request.token_price,
            request.min_investment,
            request.contract_address.as_deref(),
        )
        .await?;
        let property =
            property_repo::mark_tokenized(&mut *tx, property.id, request.contract_address.as_deref())
                .await?;
        tx.commit().await?;

        tracing::info!(
            property_id = %property.id,
            token_id = %token.id,
            total_supply = token.total_supply,
            token_price = %token.token_price,
            "Property tokenized"
        );

        Ok(TokenizedProperty { property, token })
    }

    pub async fn get_property(&self, property_id: Uuid) -> Result<Property, LedgerError> {
        property_repo::get_property(&self.pool, property_id)
            .await?
            .ok_or(LedgerError::NotFound("property"))
    }

    pub async fn list_properties(
        &self,
        status: Option<PropertyStatus>,
        limit: i64,
    ) -> Result<Vec<Property>, LedgerError> {
        Ok(property_repo::list_properties(&self.pool, status, limit).await?)
    }

    pub async fn token_for_property(&self, property_id: Uuid) -> Result<Option<PropertyToken>, LedgerError> {
        Ok(token_repo::get_token_by_property(&self.pool, property_id).await?)
    }
}
