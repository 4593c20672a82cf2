//! The stock movement ledger.
//!
//! Recording a movement must keep two writes consistent: the ledger insert
//! and the product's `quantity_on_hand`. Both happen inside one transaction,
//! and the quantity update is conditioned on the value read at the start of
//! the attempt. A concurrent writer makes that condition miss, the
//! transaction rolls back, and the whole attempt is retried from the read.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionError, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::stock_movement::{self, MovementKind};
use crate::entities::product;
use crate::errors::ServiceError;

/// Retry budget for optimistic-concurrency conflicts. Contention on a single
/// product is short-lived, so a handful of retries is enough; beyond that we
/// surface the conflict instead of spinning.
const MAX_CONFLICT_RETRIES: u32 = 5;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NewMovement {
    pub product_id: Uuid,

    pub kind: MovementKind,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,

    #[validate(length(max = 500, message = "Note cannot exceed 500 characters"))]
    pub note: Option<String>,
}

/// History filters and pagination.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MovementQuery {
    pub product_id: Option<Uuid>,
    pub kind: Option<MovementKind>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// A recorded movement together with the product state it produced.
pub struct RecordedMovement {
    pub movement: stock_movement::Model,
    pub product: product::Model,
}

#[derive(Clone)]
pub struct MovementService {
    db: Arc<DbPool>,
}

impl MovementService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Records a movement and applies it to the product's stock level.
    ///
    /// Exits that would drive stock negative are rejected with no ledger
    /// write and no stock change. Conflicting concurrent writers are retried
    /// up to [`MAX_CONFLICT_RETRIES`] times before the conflict is reported.
    pub async fn record(
        &self,
        recorded_by: &str,
        input: NewMovement,
    ) -> Result<RecordedMovement, ServiceError> {
        input.validate()?;

        let mut attempt = 0;
        loop {
            match self.try_record(recorded_by, &input).await {
                Err(ServiceError::ConcurrentModification(product_id))
                    if attempt + 1 < MAX_CONFLICT_RETRIES =>
                {
                    attempt += 1;
                    tracing::debug!(
                        product_id = %product_id,
                        attempt,
                        "stock update conflicted, retrying"
                    );
                }
                other => return other,
            }
        }
    }

    async fn try_record(
        &self,
        recorded_by: &str,
        input: &NewMovement,
    ) -> Result<RecordedMovement, ServiceError> {
        let product_id = input.product_id;
        let kind = input.kind;
        let quantity = input.quantity;
        let note = input.note.clone();
        let recorded_by = recorded_by.to_string();

        let result = self
            .db
            .as_ref()
            .transaction::<_, RecordedMovement, ServiceError>(move |txn: &DatabaseTransaction| {
                Box::pin(async move {
                    let current = product::Entity::find_by_id(product_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Product {} not found", product_id))
                        })?;

                    let observed = current.quantity_on_hand;
                    let new_quantity = match kind {
                        MovementKind::Entry => observed
                            .checked_add(quantity)
                            .ok_or_else(|| {
                                ServiceError::ValidationError(
                                    "Resulting stock level is out of range".to_string(),
                                )
                            })?,
                        MovementKind::Exit => {
                            if observed < quantity {
                                return Err(ServiceError::InsufficientStock(format!(
                                    "Cannot remove {} unit(s) of '{}'; only {} on hand",
                                    quantity, current.name, observed
                                )));
                            }
                            observed - quantity
                        }
                    };

                    // Conditioned on the quantity read above. Zero rows means
                    // someone else changed stock between the read and here.
                    let update = product::Entity::update_many()
                        .col_expr(product::Column::QuantityOnHand, Expr::value(new_quantity))
                        .col_expr(product::Column::UpdatedAt, Expr::value(Some(Utc::now())))
                        .filter(product::Column::Id.eq(product_id))
                        .filter(product::Column::QuantityOnHand.eq(observed))
                        .exec(txn)
                        .await?;

                    if update.rows_affected == 0 {
                        return Err(ServiceError::ConcurrentModification(product_id));
                    }

                    let movement = stock_movement::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        product_id: Set(product_id),
                        product_name: Set(current.name.clone()),
                        kind: Set(kind),
                        quantity: Set(quantity),
                        note: Set(note.filter(|n| !n.trim().is_empty())),
                        recorded_by: Set(recorded_by),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    let product = product::Entity::find_by_id(product_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Product {} not found", product_id))
                        })?;

                    Ok(RecordedMovement { movement, product })
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        tracing::info!(
            movement_id = %result.movement.id,
            product_id = %result.product.id,
            kind = ?result.movement.kind,
            quantity = result.movement.quantity,
            quantity_on_hand = result.product.quantity_on_hand,
            "stock movement recorded"
        );
        Ok(result)
    }

    /// Movement history, newest first.
    pub async fn list(
        &self,
        query: MovementQuery,
    ) -> Result<(Vec<stock_movement::Model>, u64), ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(50).clamp(1, 200);

        let mut finder = stock_movement::Entity::find()
            .order_by_desc(stock_movement::Column::CreatedAt);
        if let Some(product_id) = query.product_id {
            finder = finder.filter(stock_movement::Column::ProductId.eq(product_id));
        }
        if let Some(kind) = query.kind {
            finder = finder.filter(stock_movement::Column::Kind.eq(kind));
        }

        let paginator = finder.paginate(self.db.as_ref(), per_page);
        let total = paginator.num_items().await?;
        let movements = paginator.fetch_page(page - 1).await?;
        Ok((movements, total))
    }
}

fn unwrap_transaction_error(err: TransactionError<ServiceError>) -> ServiceError {
    match err {
        TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}
