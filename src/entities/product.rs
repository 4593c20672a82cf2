use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Product entity. `quantity_on_hand` is the source of truth for current
/// stock; the movement ledger never is.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate, ToSchema)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Product name
    #[validate(length(
        min = 2,
        max = 255,
        message = "Product name must be between 2 and 255 characters"
    ))]
    pub name: String,

    /// Product description
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,

    /// Barcode or UPC
    pub barcode: Option<String>,

    /// Expiry date for perishables
    pub expires_on: Option<NaiveDate>,

    /// Unit price, never negative
    pub unit_price: Decimal,

    /// Current stock level, never negative
    pub quantity_on_hand: i32,

    /// Level at which the dashboard flags the product for restocking
    pub minimum_stock: i32,

    /// Registration timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.quantity_on_hand {
                active_model.quantity_on_hand = Set(0);
            }
            if let ActiveValue::NotSet = active_model.minimum_stock {
                active_model.minimum_stock = Set(0);
            }
            active_model.created_at = Set(Utc::now());
        }

        active_model.updated_at = Set(Some(Utc::now()));

        let model: Model = active_model.clone().try_into().map_err(|_| {
            DbErr::Custom("Failed to convert ActiveModel to Model for validation".to_string())
        })?;

        if let Err(err) = model.validate() {
            return Err(DbErr::Custom(format!("Validation error: {}", err)));
        }

        Ok(active_model)
    }
}

impl Model {
    /// Whether current stock sits at or below the restock threshold.
    pub fn is_below_minimum(&self) -> bool {
        self.quantity_on_hand <= self.minimum_stock
    }
}
