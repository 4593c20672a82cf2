//! Product catalog management.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::product;
use crate::errors::ServiceError;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NewProduct {
    #[validate(length(
        min = 2,
        max = 255,
        message = "Product name must be between 2 and 255 characters"
    ))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,

    pub barcode: Option<String>,

    pub expires_on: Option<NaiveDate>,

    pub unit_price: Decimal,

    /// Opening stock; later changes go through the movement ledger.
    #[serde(default)]
    pub quantity_on_hand: Option<i32>,

    #[serde(default)]
    pub minimum_stock: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[validate(length(
        min = 2,
        max = 255,
        message = "Product name must be between 2 and 255 characters"
    ))]
    pub name: Option<String>,

    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,

    pub barcode: Option<String>,

    pub expires_on: Option<NaiveDate>,

    pub unit_price: Option<Decimal>,

    pub minimum_stock: Option<i32>,
}

/// Listing filters and pagination.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductQuery {
    /// Case-insensitive substring match on the name
    pub search: Option<String>,
    /// Only products at or below their restock threshold
    #[serde(default)]
    pub below_minimum: bool,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn list(&self, query: ProductQuery) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(50).clamp(1, 200);

        let mut condition = Condition::all();
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            condition = condition.add(product::Column::Name.contains(search));
        }
        if query.below_minimum {
            // Cross-column comparison, so `total` and the page contents come
            // from the same filtered query.
            condition = condition.add(
                Expr::col(product::Column::QuantityOnHand)
                    .lte(Expr::col(product::Column::MinimumStock)),
            );
        }

        let finder = product::Entity::find()
            .filter(condition)
            .order_by_asc(product::Column::Name);

        let paginator = finder.paginate(self.db.as_ref(), per_page);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page - 1).await?;

        Ok((products, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    pub async fn create(&self, input: NewProduct) -> Result<product::Model, ServiceError> {
        input.validate()?;
        validate_non_negative(input.unit_price, input.quantity_on_hand, input.minimum_stock)?;

        let active = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            description: Set(normalize_optional(input.description)),
            barcode: Set(normalize_optional(input.barcode)),
            expires_on: Set(input.expires_on),
            unit_price: Set(input.unit_price),
            quantity_on_hand: Set(input.quantity_on_hand.unwrap_or(0)),
            minimum_stock: Set(input.minimum_stock.unwrap_or(0)),
            ..Default::default()
        };

        let product = active.insert(self.db.as_ref()).await?;
        tracing::info!(product_id = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    /// Updates catalog fields. `quantity_on_hand` is deliberately absent from
    /// [`UpdateProduct`]; stock only changes through recorded movements.
    pub async fn update(&self, id: Uuid, input: UpdateProduct) -> Result<product::Model, ServiceError> {
        input.validate()?;
        validate_non_negative(
            input.unit_price.unwrap_or_default(),
            None,
            input.minimum_stock,
        )?;

        let existing = self.get(id).await?;

        let mut active = existing.into_active_model();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(normalize_optional(Some(description)));
        }
        if let Some(barcode) = input.barcode {
            active.barcode = Set(normalize_optional(Some(barcode)));
        }
        if let Some(expires_on) = input.expires_on {
            active.expires_on = Set(Some(expires_on));
        }
        if let Some(unit_price) = input.unit_price {
            active.unit_price = Set(unit_price);
        }
        if let Some(minimum_stock) = input.minimum_stock {
            active.minimum_stock = Set(minimum_stock);
        }

        let product = active.update(self.db.as_ref()).await?;
        tracing::info!(product_id = %product.id, "product updated");
        Ok(product)
    }

    /// Deletes a product. Its movement history is left in place; each
    /// movement carries a name snapshot, so history stays displayable after
    /// the product is gone.
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        product::Entity::delete_by_id(existing.id)
            .exec(self.db.as_ref())
            .await?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn validate_non_negative(
    unit_price: Decimal,
    quantity_on_hand: Option<i32>,
    minimum_stock: Option<i32>,
) -> Result<(), ServiceError> {
    if unit_price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Unit price cannot be negative".to_string(),
        ));
    }
    if quantity_on_hand.map(|q| q < 0).unwrap_or(false) {
        return Err(ServiceError::ValidationError(
            "Quantity on hand cannot be negative".to_string(),
        ));
    }
    if minimum_stock.map(|m| m < 0).unwrap_or(false) {
        return Err(ServiceError::ValidationError(
            "Minimum stock cannot be negative".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn negative_money_and_quantities_are_rejected() {
        assert_matches!(
            validate_non_negative(dec!(-0.01), None, None),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            validate_non_negative(dec!(1.00), Some(-1), None),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            validate_non_negative(dec!(1.00), None, Some(-5)),
            Err(ServiceError::ValidationError(_))
        );
        assert!(validate_non_negative(dec!(0.00), Some(0), Some(0)).is_ok());
    }

    #[test]
    fn optional_strings_normalize_to_none_when_blank() {
        assert_eq!(normalize_optional(Some("  ".to_string())), None);
        assert_eq!(
            normalize_optional(Some(" trimmed ".to_string())),
            Some("trimmed".to_string())
        );
        assert_eq!(normalize_optional(None), None);
    }
}
