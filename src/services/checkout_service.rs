//! Cart to order conversion.
//!
//! One checkout is one database transaction: stock is validated under row
//! locks, the order and its item snapshots are written, stock is decremented
//! and the purchased lines leave the cart, or none of it happens. Low-stock
//! alerts are only handed out once the transaction has committed.

use std::collections::HashMap;

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use uuid::Uuid;

use crate::{
    config::CheckoutSettings,
    entity::{order_items, orders},
    error::{AppError, AppResult},
    pricing::{PriceCalculator, PricedLine},
    services::{
        notification::{LowStockAlert, LowStockNotifier, SharedNotifier},
        order_number::OrderNumberGenerator,
        stock_validator::{ReservedLine, validate_stock},
    },
    store::{
        CartLine, CartStore, OrderDraft, OrderItemDraft, OrderStore, ProductStore, SeaCartStore,
        SeaOrderStore, SeaProductStore,
    },
};

pub const ALL_OUT_OF_STOCK: &str = "All items in your cart are out of stock.";

#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order: orders::Model,
    pub items: Vec<order_items::Model>,
    /// Lines left in the cart because they could not be fulfilled.
    pub unavailable: Vec<CartLine>,
}

pub struct CheckoutService<C = SeaCartStore, P = SeaProductStore, O = SeaOrderStore, N = SharedNotifier> {
    orm: DatabaseConnection,
    settings: CheckoutSettings,
    pricing: PriceCalculator,
    carts: C,
    products: P,
    orders: O,
    notifier: N,
}

impl CheckoutService {
    pub fn new(orm: DatabaseConnection, settings: CheckoutSettings, notifier: SharedNotifier) -> Self {
        let orders = SeaOrderStore::new(OrderNumberGenerator::new(settings.order_number_attempts));
        Self::with_stores(orm, settings, SeaCartStore, SeaProductStore, orders, notifier)
    }
}

impl<C, P, O, N> CheckoutService<C, P, O, N>
where
    C: CartStore,
    P: ProductStore,
    O: OrderStore,
    N: LowStockNotifier,
{
    pub fn with_stores(
        orm: DatabaseConnection,
        settings: CheckoutSettings,
        carts: C,
        products: P,
        orders: O,
        notifier: N,
    ) -> Self {
        let pricing =
            PriceCalculator::new(settings.vat_rate).with_discount(settings.discount.clone());
        Self {
            orm,
            settings,
            pricing,
            carts,
            products,
            orders,
            notifier,
        }
    }

    pub fn settings(&self) -> &CheckoutSettings {
        &self.settings
    }

    pub fn pricing(&self) -> &PriceCalculator {
        &self.pricing
    }

    /// Converts the user's cart into an order, retrying the whole
    /// transaction when the database reports a lock conflict.
    pub async fn process_checkout(&self, user_id: Uuid) -> AppResult<CheckoutReceipt> {
        let mut attempt = 1;
        loop {
            match self.checkout_once(user_id).await {
                Err(err) if err.is_transient() && attempt < self.settings.max_attempts => {
                    tracing::warn!(%user_id, attempt, error = %err, "checkout conflicted, retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
                Ok((receipt, alerts)) => {
                    tracing::info!(
                        %user_id,
                        order_number = %receipt.order.order_number,
                        total = %receipt.order.total(),
                        items = receipt.items.len(),
                        skipped = receipt.unavailable.len(),
                        "checkout completed"
                    );
                    for alert in alerts {
                        self.notifier.notify_low_stock(alert);
                    }
                    return Ok(receipt);
                }
            }
        }
    }

    async fn checkout_once(&self, user_id: Uuid) -> AppResult<(CheckoutReceipt, Vec<LowStockAlert>)> {
        let txn = self.orm.begin().await?;
        match self.checkout_in(&txn, user_id).await {
            Ok(outcome) => {
                txn.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::warn!(error = %rollback_err, "checkout rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn checkout_in(
        &self,
        txn: &DatabaseTransaction,
        user_id: Uuid,
    ) -> AppResult<(CheckoutReceipt, Vec<LowStockAlert>)> {
        let cart_id = self
            .carts
            .find_cart_id(txn, user_id)
            .await?
            .ok_or(AppError::EmptyCart)?;
        let lines = self.carts.lines(txn, cart_id).await?;
        if lines.is_empty() {
            return Err(AppError::EmptyCart);
        }

        let stock = validate_stock(&self.products, txn, &lines).await?;
        if stock.is_empty() {
            return Err(AppError::InsufficientStock(ALL_OUT_OF_STOCK.to_string()));
        }

        let priced: Vec<PricedLine> = stock
            .available
            .iter()
            .map(|reserved| PricedLine {
                unit_price: reserved.product.price(),
                quantity: reserved.line.quantity,
            })
            .collect();
        let pricing = self.pricing.calculate_order_pricing(&priced, None)?;

        let order = self
            .orders
            .create(
                txn,
                OrderDraft {
                    user_id,
                    pricing,
                    vat_rate: self.pricing.default_vat(),
                    status: self.settings.initial_status,
                },
            )
            .await?;

        let drafts = stock.available.iter().map(item_draft).collect();
        let items = self.orders.create_items(txn, order.id, drafts).await?;

        let mut alerts = Vec::new();
        let mut remaining: HashMap<Uuid, i32> = HashMap::new();
        for reserved in &stock.available {
            let product = &reserved.product;
            let quantity = reserved.line.quantity;
            self.products
                .decrement_stock(txn, product.id, quantity)
                .await?;

            let left = remaining.entry(product.id).or_insert(product.stock_quantity);
            let before = *left;
            let after = before - quantity;
            *left = after;
            let threshold = self.settings.low_stock_threshold;
            if before > threshold && after <= threshold {
                alerts.push(LowStockAlert {
                    product_id: product.id,
                    name: product.name.clone(),
                    stock_remaining: after,
                    threshold,
                });
            }
        }

        let purchased: Vec<Uuid> = stock.available.iter().map(|r| r.line.id).collect();
        self.carts.remove_lines(txn, cart_id, &purchased).await?;

        Ok((
            CheckoutReceipt {
                order,
                items,
                unavailable: stock.unavailable,
            },
            alerts,
        ))
    }
}

fn item_draft(reserved: &ReservedLine) -> OrderItemDraft {
    OrderItemDraft {
        product_id: reserved.product.id,
        quantity: reserved.line.quantity,
        price_snapshot: reserved.product.price(),
        product_snapshot: reserved.product.to_snapshot(),
    }
}
