use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    OrderStatus, order_items::Model as OrderItemModel, orders::Model as OrderModel,
    products::Model as ProductModel,
};
use crate::money::{Money, MoneyError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductImage {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub order: i32,
}

/// Product as it looked when an order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "10.99")]
    pub price: Money,
    pub images: Vec<ProductImage>,
    pub primary_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "10.99")]
    pub price: Money,
    pub formatted_price: String,
    pub stock_quantity: i32,
    pub images: Vec<ProductImage>,
    pub primary_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: OrderStatus,
    #[schema(value_type = String, example = "100.00")]
    pub subtotal: Money,
    #[schema(value_type = String, example = "7.5")]
    pub vat_rate: Decimal,
    #[schema(value_type = String, example = "7.50")]
    pub vat_amount: Money,
    #[schema(value_type = String, example = "107.50")]
    pub total: Money,
    pub formatted_total: String,
    #[schema(value_type = Object)]
    pub pricing_breakdown: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    #[schema(value_type = String, example = "10.99")]
    pub price_snapshot: Money,
    #[schema(value_type = String, example = "32.97")]
    pub subtotal: Money,
    pub product_name: String,
    pub product_image: Option<String>,
    #[schema(value_type = Object)]
    pub product_snapshot: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        price: model.price(),
        formatted_price: model.price().format_price(),
        images: model.sorted_images(),
        primary_image: model.primary_image().map(|img| img.url),
        name: model.name,
        description: model.description,
        stock_quantity: model.stock_quantity,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        subtotal: model.subtotal(),
        vat_rate: model.vat_rate().percent(),
        vat_amount: model.vat_amount(),
        total: model.total(),
        formatted_total: model.total().format_price(),
        order_number: model.order_number,
        user_id: model.user_id,
        status: model.status,
        pricing_breakdown: model.pricing_breakdown,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn order_item_from_entity(model: OrderItemModel) -> Result<OrderItem, MoneyError> {
    Ok(OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        price_snapshot: model.price_snapshot(),
        subtotal: model.subtotal()?,
        product_name: model.product_name(),
        product_image: model.product_image(),
        created_at: model.created_at.with_timezone(&Utc),
        product_snapshot: model.product_snapshot,
    })
}
