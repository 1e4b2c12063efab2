use async_trait::async_trait;
use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, Set, SqlErr, TransactionTrait};
use uuid::Uuid;

use crate::{
    entity::{order_items, orders},
    error::AppResult,
    services::order_number::OrderNumberGenerator,
};

use super::{OrderDraft, OrderItemDraft, OrderStore};

#[derive(Debug, Clone, Default)]
pub struct SeaOrderStore {
    numbers: OrderNumberGenerator,
}

impl SeaOrderStore {
    pub fn new(numbers: OrderNumberGenerator) -> Self {
        Self { numbers }
    }
}

#[async_trait]
impl OrderStore for SeaOrderStore {
    async fn create(
        &self,
        txn: &DatabaseTransaction,
        draft: OrderDraft,
    ) -> AppResult<orders::Model> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let vat_amount = draft.pricing.vat().map(|e| e.amount).unwrap_or_default();
        let breakdown = serde_json::to_value(&draft.pricing.breakdown)?;

        let template = orders::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(String::new()),
            user_id: Set(draft.user_id),
            subtotal_cents: Set(draft.pricing.subtotal.cents()),
            vat_rate_bps: Set(draft.vat_rate.basis_points()),
            vat_amount_cents: Set(vat_amount.cents()),
            total_cents: Set(draft.pricing.total.cents()),
            pricing_breakdown: Set(breakdown),
            status: Set(draft.status),
            created_at: Set(now),
            updated_at: Set(now),
        };

        self.numbers
            .reserve(now.date_naive(), |candidate| {
                let mut order = template.clone();
                order.order_number = Set(candidate);
                insert_under_savepoint(txn, order)
            })
            .await
    }

    async fn create_items(
        &self,
        txn: &DatabaseTransaction,
        order_id: Uuid,
        items: Vec<OrderItemDraft>,
    ) -> AppResult<Vec<order_items::Model>> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut created = Vec::with_capacity(items.len());
        for item in items {
            let model = order_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                price_snapshot_cents: Set(item.price_snapshot.cents()),
                product_snapshot: Set(serde_json::to_value(&item.product_snapshot)?),
                created_at: Set(now),
            }
            .insert(txn)
            .await?;
            created.push(model);
        }
        Ok(created)
    }
}

/// Inserts `order` under a savepoint; `Ok(None)` means the order number was
/// already taken and only the savepoint was unwound.
async fn insert_under_savepoint(
    txn: &DatabaseTransaction,
    order: orders::ActiveModel,
) -> AppResult<Option<orders::Model>> {
    let savepoint = txn.begin().await?;
    match order.insert(&savepoint).await {
        Ok(model) => {
            savepoint.commit().await?;
            Ok(Some(model))
        }
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            savepoint.rollback().await?;
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}
