//! Persistence seams used by checkout.
//!
//! Every method runs inside the caller's transaction; implementations must
//! not reach for the pool, or they would step outside the atomic unit.

mod cart;
mod order;
mod product;

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DatabaseTransaction;
use uuid::Uuid;

use crate::entity::{OrderStatus, order_items, orders, products};
use crate::error::AppResult;
use crate::models::ProductSnapshot;
use crate::money::Money;
use crate::pricing::{PricingResult, VatRate};

pub use cart::SeaCartStore;
pub use order::SeaOrderStore;
pub use product::SeaProductStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: Uuid,
    pub pricing: PricingResult,
    pub vat_rate: VatRate,
    pub status: OrderStatus,
}

#[derive(Debug, Clone)]
pub struct OrderItemDraft {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_snapshot: Money,
    pub product_snapshot: ProductSnapshot,
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_cart_id(&self, txn: &DatabaseTransaction, user_id: Uuid)
    -> AppResult<Option<Uuid>>;

    /// Lines in the order they were added to the cart.
    async fn lines(&self, txn: &DatabaseTransaction, cart_id: Uuid) -> AppResult<Vec<CartLine>>;

    async fn remove_lines(
        &self,
        txn: &DatabaseTransaction,
        cart_id: Uuid,
        line_ids: &[Uuid],
    ) -> AppResult<u64>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Reads the product under an exclusive row lock held until commit.
    async fn lock_and_read(
        &self,
        txn: &DatabaseTransaction,
        product_id: Uuid,
    ) -> AppResult<Option<products::Model>>;

    /// Fails with `InsufficientStock` rather than letting stock go negative.
    async fn decrement_stock(
        &self,
        txn: &DatabaseTransaction,
        product_id: Uuid,
        amount: i32,
    ) -> AppResult<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, txn: &DatabaseTransaction, draft: OrderDraft)
    -> AppResult<orders::Model>;

    async fn create_items(
        &self,
        txn: &DatabaseTransaction,
        order_id: Uuid,
        items: Vec<OrderItemDraft>,
    ) -> AppResult<Vec<order_items::Model>>;
}

#[async_trait]
impl<T: CartStore + ?Sized> CartStore for Arc<T> {
    async fn find_cart_id(
        &self,
        txn: &DatabaseTransaction,
        user_id: Uuid,
    ) -> AppResult<Option<Uuid>> {
        (**self).find_cart_id(txn, user_id).await
    }

    async fn lines(&self, txn: &DatabaseTransaction, cart_id: Uuid) -> AppResult<Vec<CartLine>> {
        (**self).lines(txn, cart_id).await
    }

    async fn remove_lines(
        &self,
        txn: &DatabaseTransaction,
        cart_id: Uuid,
        line_ids: &[Uuid],
    ) -> AppResult<u64> {
        (**self).remove_lines(txn, cart_id, line_ids).await
    }
}

#[async_trait]
impl<T: ProductStore + ?Sized> ProductStore for Arc<T> {
    async fn lock_and_read(
        &self,
        txn: &DatabaseTransaction,
        product_id: Uuid,
    ) -> AppResult<Option<products::Model>> {
        (**self).lock_and_read(txn, product_id).await
    }

    async fn decrement_stock(
        &self,
        txn: &DatabaseTransaction,
        product_id: Uuid,
        amount: i32,
    ) -> AppResult<()> {
        (**self).decrement_stock(txn, product_id, amount).await
    }
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn create(&self, txn: &DatabaseTransaction, draft: OrderDraft)
    -> AppResult<orders::Model> {
        (**self).create(txn, draft).await
    }

    async fn create_items(
        &self,
        txn: &DatabaseTransaction,
        order_id: Uuid,
        items: Vec<OrderItemDraft>,
    ) -> AppResult<Vec<order_items::Model>> {
        (**self).create_items(txn, order_id, items).await
    }
}
