use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::{
    entity::{Products, products},
    error::{AppError, AppResult},
};

use super::ProductStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct SeaProductStore;

#[async_trait]
impl ProductStore for SeaProductStore {
    async fn lock_and_read(
        &self,
        txn: &DatabaseTransaction,
        product_id: Uuid,
    ) -> AppResult<Option<products::Model>> {
        let product = Products::find_by_id(product_id)
            .lock(LockType::Update)
            .one(txn)
            .await?;
        Ok(product)
    }

    async fn decrement_stock(
        &self,
        txn: &DatabaseTransaction,
        product_id: Uuid,
        amount: i32,
    ) -> AppResult<()> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let result = Products::update_many()
            .col_expr(
                products::Column::StockQuantity,
                Expr::col(products::Column::StockQuantity).sub(amount),
            )
            .col_expr(products::Column::UpdatedAt, Expr::value(now))
            .filter(products::Column::Id.eq(product_id))
            .filter(products::Column::StockQuantity.gte(amount))
            .exec(txn)
            .await?;

        if result.rows_affected == 0 {
            tracing::warn!(%product_id, amount, "stock decrement refused");
            return Err(AppError::InsufficientStock(format!(
                "Insufficient stock for product {product_id}."
            )));
        }
        Ok(())
    }
}
