use sea_orm::entity::prelude::*;

use crate::models::{ProductImage, ProductSnapshot};
use crate::money::Money;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock_quantity: i32,
    pub images: Json,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart_items::Entity")]
    CartItems,
}

impl Related<super::cart_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Malformed image JSON reads as no images.
    pub fn images(&self) -> Vec<ProductImage> {
        serde_json::from_value(self.images.clone()).unwrap_or_default()
    }

    pub fn primary_image(&self) -> Option<ProductImage> {
        let images = self.images();
        images
            .iter()
            .find(|img| img.is_primary)
            .or_else(|| images.first())
            .cloned()
    }

    pub fn sorted_images(&self) -> Vec<ProductImage> {
        let mut images = self.images();
        images.sort_by_key(|img| img.order);
        images
    }

    pub fn has_stock(&self, quantity: i32) -> bool {
        self.stock_quantity >= quantity
    }

    pub fn is_low_stock(&self, threshold: i32) -> bool {
        self.stock_quantity > 0 && self.stock_quantity <= threshold
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.stock_quantity <= 0
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn to_snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price(),
            images: self.sorted_images(),
            primary_image: self.primary_image().map(|img| img.url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(stock: i32, images: Json) -> Model {
        let now = Utc::now().into();
        Model {
            id: Uuid::new_v4(),
            name: "Lamp".into(),
            description: None,
            price_cents: 2499,
            stock_quantity: stock,
            images,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn stock_flags() {
        assert!(product(5, Json::Null).is_low_stock(10));
        assert!(product(10, Json::Null).is_low_stock(10));
        assert!(!product(11, Json::Null).is_low_stock(10));
        assert!(!product(0, Json::Null).is_low_stock(10));
        assert!(product(0, Json::Null).is_out_of_stock());
        assert!(product(3, Json::Null).has_stock(3));
        assert!(!product(3, Json::Null).has_stock(4));
    }

    #[test]
    fn primary_image_falls_back_to_first() {
        let images = serde_json::json!([
            { "url": "b.jpg", "order": 2 },
            { "url": "a.jpg", "order": 1 }
        ]);
        let p = product(1, images);
        assert_eq!(p.primary_image().unwrap().url, "b.jpg");
        let sorted: Vec<_> = p.sorted_images().into_iter().map(|i| i.url).collect();
        assert_eq!(sorted, ["a.jpg", "b.jpg"]);

        let flagged = product(
            1,
            serde_json::json!([
                { "url": "a.jpg", "order": 1 },
                { "url": "hero.jpg", "order": 2, "is_primary": true }
            ]),
        );
        assert_eq!(flagged.primary_image().unwrap().url, "hero.jpg");
        assert!(product(1, Json::Null).primary_image().is_none());
    }

    #[test]
    fn snapshot_carries_price_and_images() {
        let p = product(1, serde_json::json!([{ "url": "a.jpg", "order": 0 }]));
        let snapshot = p.to_snapshot();
        assert_eq!(snapshot.price.to_string(), "24.99");
        assert_eq!(snapshot.primary_image.as_deref(), Some("a.jpg"));
        assert_eq!(snapshot.images.len(), 1);
    }
}
