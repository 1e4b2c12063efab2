use sea_orm::entity::prelude::*;

use crate::models::ProductImage;
use crate::money::{Money, MoneyError};

/// `product_id` is a weak reference: the product may be deleted later, so
/// everything needed for display lives in `product_snapshot`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_snapshot_cents: i64,
    pub product_snapshot: Json,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id",
        on_delete = "Cascade"
    )]
    Orders,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

impl Model {
    pub fn price_snapshot(&self) -> Money {
        Money::from_cents(self.price_snapshot_cents)
    }

    pub fn subtotal(&self) -> Result<Money, MoneyError> {
        self.price_snapshot().times(self.quantity)
    }

    pub fn product_name(&self) -> String {
        self.product_snapshot
            .get("name")
            .and_then(Json::as_str)
            .unwrap_or(UNKNOWN_PRODUCT)
            .to_string()
    }

    pub fn product_image(&self) -> Option<String> {
        if let Some(url) = self.product_snapshot.get("primary_image").and_then(Json::as_str) {
            return Some(url.to_string());
        }
        let images: Vec<ProductImage> = self
            .product_snapshot
            .get("images")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        images.into_iter().next().map(|img| img.url)
    }
}
