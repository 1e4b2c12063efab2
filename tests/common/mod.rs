#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, Set};
use storefront_checkout::{
    config::CheckoutSettings,
    db::{OrmConn, create_orm_conn, run_migrations},
    dto::cart::AddToCartRequest,
    entity::products,
    middleware::auth::AuthUser,
    money::Money,
    services::{
        cart_service,
        notification::{LowStockAlert, LowStockNotifier},
    },
    state::AppState,
};
use uuid::Uuid;

/// Runs against `TEST_DATABASE_URL` when set, otherwise a private in-memory
/// SQLite database. Every test works with fresh user and product ids, so a
/// shared Postgres database needs no cleanup between runs.
pub async fn connect() -> anyhow::Result<OrmConn> {
    let database_url =
        std::env::var("TEST_DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    Ok(orm)
}

#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<LowStockAlert>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<LowStockAlert> {
        self.alerts.lock().unwrap().clone()
    }
}

impl LowStockNotifier for RecordingNotifier {
    fn notify_low_stock(&self, alert: LowStockAlert) {
        self.alerts.lock().unwrap().push(alert);
    }
}

pub struct TestApp {
    pub state: AppState,
    pub notifier: Arc<RecordingNotifier>,
}

pub async fn setup() -> anyhow::Result<TestApp> {
    setup_with(CheckoutSettings::default()).await
}

pub async fn setup_with(settings: CheckoutSettings) -> anyhow::Result<TestApp> {
    let orm = connect().await?;
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::new(orm, settings, notifier.clone());
    Ok(TestApp { state, notifier })
}

pub fn new_user() -> AuthUser {
    AuthUser::new(Uuid::new_v4())
}

pub async fn seed_product(
    orm: &OrmConn,
    name: &str,
    price: &str,
    stock: i32,
) -> anyhow::Result<products::Model> {
    let price: Money = price.parse()?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let product = products::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(Some(format!("{name} for testing"))),
        price_cents: Set(price.cents()),
        stock_quantity: Set(stock),
        images: Set(serde_json::json!([
            { "url": format!("https://img.test/{}.jpg", name.to_lowercase()), "is_primary": true, "order": 0 }
        ])),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(orm)
    .await?;
    Ok(product)
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    product: &products::Model,
    quantity: i32,
) -> anyhow::Result<()> {
    cart_service::add_to_cart(
        state,
        user,
        AddToCartRequest {
            product_id: product.id,
            quantity,
        },
    )
    .await?;
    Ok(())
}

pub async fn stock_of(orm: &OrmConn, product_id: Uuid) -> anyhow::Result<i32> {
    use sea_orm::EntityTrait;
    let product = storefront_checkout::entity::Products::find_by_id(product_id)
        .one(orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {product_id} vanished"))?;
    Ok(product.stock_quantity)
}
