use std::collections::HashMap;

use sea_orm::DatabaseTransaction;
use uuid::Uuid;

use crate::{entity::products, error::AppResult, store::CartLine, store::ProductStore};

/// A cart line whose product is locked and has enough stock.
#[derive(Debug, Clone)]
pub struct ReservedLine {
    pub line: CartLine,
    pub product: products::Model,
}

#[derive(Debug, Default)]
pub struct StockCheck {
    pub available: Vec<ReservedLine>,
    pub unavailable: Vec<CartLine>,
}

impl StockCheck {
    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}

/// Locks every product referenced by `lines` and splits the lines by whether
/// they can be fulfilled right now.
///
/// Rows are locked in ascending product id so two carts sharing products
/// always queue in the same order. The partition keeps the cart's order.
pub async fn validate_stock<P: ProductStore + ?Sized>(
    products: &P,
    txn: &DatabaseTransaction,
    lines: &[CartLine],
) -> AppResult<StockCheck> {
    let mut product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    product_ids.sort_unstable();
    product_ids.dedup();

    let mut locked: HashMap<Uuid, products::Model> = HashMap::with_capacity(product_ids.len());
    for product_id in product_ids {
        if let Some(product) = products.lock_and_read(txn, product_id).await? {
            locked.insert(product_id, product);
        }
    }

    // Two lines for one product draw from the same stock.
    let mut claimed: HashMap<Uuid, i32> = HashMap::new();
    let mut check = StockCheck::default();
    for line in lines {
        let fulfillable = locked.get(&line.product_id).filter(|product| {
            let already = claimed.get(&product.id).copied().unwrap_or(0);
            line.quantity > 0 && !product.is_deleted() && product.has_stock(already + line.quantity)
        });

        match fulfillable {
            Some(product) => {
                *claimed.entry(product.id).or_insert(0) += line.quantity;
                check.available.push(ReservedLine {
                    line: *line,
                    product: product.clone(),
                });
            }
            None => {
                tracing::debug!(product_id = %line.product_id, quantity = line.quantity, "line unavailable");
                check.unavailable.push(*line);
            }
        }
    }

    Ok(check)
}
