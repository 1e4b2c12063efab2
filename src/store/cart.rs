use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::{
    entity::{
        CartItems, Carts,
        cart_items::Column as CartItemCol,
        carts::Column as CartCol,
    },
    error::AppResult,
};

use super::{CartLine, CartStore};

#[derive(Debug, Clone, Copy, Default)]
pub struct SeaCartStore;

#[async_trait]
impl CartStore for SeaCartStore {
    async fn find_cart_id(
        &self,
        txn: &DatabaseTransaction,
        user_id: Uuid,
    ) -> AppResult<Option<Uuid>> {
        let cart = Carts::find()
            .filter(CartCol::UserId.eq(user_id))
            .one(txn)
            .await?;
        Ok(cart.map(|c| c.id))
    }

    async fn lines(&self, txn: &DatabaseTransaction, cart_id: Uuid) -> AppResult<Vec<CartLine>> {
        let lines = CartItems::find()
            .filter(CartItemCol::CartId.eq(cart_id))
            .order_by_asc(CartItemCol::CreatedAt)
            .order_by_asc(CartItemCol::Id)
            .all(txn)
            .await?
            .into_iter()
            .map(|item| CartLine {
                id: item.id,
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect();
        Ok(lines)
    }

    async fn remove_lines(
        &self,
        txn: &DatabaseTransaction,
        cart_id: Uuid,
        line_ids: &[Uuid],
    ) -> AppResult<u64> {
        if line_ids.is_empty() {
            return Ok(0);
        }
        let result = CartItems::delete_many()
            .filter(CartItemCol::CartId.eq(cart_id))
            .filter(CartItemCol::Id.is_in(line_ids.iter().copied()))
            .exec(txn)
            .await?;
        Ok(result.rows_affected)
    }
}
