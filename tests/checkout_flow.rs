mod common;

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use storefront_checkout::{
    config::CheckoutSettings,
    entity::{OrderItems, OrderStatus, Orders, Products, order_items, orders, products},
    error::{AppError, AppResult},
    money::Money,
    pricing::FixedDiscount,
    services::{
        cart_service,
        checkout_service::{ALL_OUT_OF_STOCK, CheckoutService},
        order_number::is_well_formed,
        order_service,
    },
    store::{
        CartLine, CartStore, OrderDraft, OrderItemDraft, OrderStore, SeaCartStore, SeaOrderStore,
        SeaProductStore,
    },
};
use uuid::Uuid;

use common::{RecordingNotifier, add_to_cart, new_user, seed_product, setup, setup_with, stock_of};

async fn orders_for(orm: &sea_orm::DatabaseConnection, user_id: Uuid) -> anyhow::Result<u64> {
    Ok(Orders::find()
        .filter(orders::Column::UserId.eq(user_id))
        .count(orm)
        .await?)
}

#[tokio::test]
async fn checkout_prices_single_line_with_default_vat() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = new_user();
    let product = seed_product(&app.state.orm, "Widget", "100.00", 10).await?;
    add_to_cart(&app.state, &user, &product, 1).await?;

    let receipt = app.state.checkout.process_checkout(user.user_id).await?;
    let order = &receipt.order;

    assert_eq!(order.subtotal().to_string(), "100.00");
    assert_eq!(order.vat_amount().to_string(), "7.50");
    assert_eq!(order.total().to_string(), "107.50");
    assert_eq!(order.vat_rate().to_string(), "7.5");
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(is_well_formed(&order.order_number), "{}", order.order_number);

    assert_eq!(
        order.pricing_breakdown,
        serde_json::json!([
            { "key": "vat", "amount": "7.50", "label": "VAT (7.5%)", "rate": "7.5" }
        ])
    );
    Ok(())
}

#[tokio::test]
async fn checkout_rounds_vat_half_up_and_decrements_stock() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = new_user();
    let product = seed_product(&app.state.orm, "Mug", "10.99", 10).await?;
    add_to_cart(&app.state, &user, &product, 3).await?;

    let receipt = app.state.checkout.process_checkout(user.user_id).await?;

    assert_eq!(receipt.order.subtotal().to_string(), "32.97");
    assert_eq!(receipt.order.vat_amount().to_string(), "2.47");
    assert_eq!(receipt.order.total().to_string(), "35.44");
    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.items[0].price_snapshot().to_string(), "10.99");
    assert_eq!(receipt.items[0].quantity, 3);
    assert!(receipt.unavailable.is_empty());

    assert_eq!(stock_of(&app.state.orm, product.id).await?, 7);

    let cart = cart_service::list_cart(&app.state, &user).await?.data.unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(cart.total, Money::ZERO);
    Ok(())
}

#[tokio::test]
async fn empty_cart_is_rejected_and_nothing_is_written() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = new_user();

    // No cart at all.
    let err = app.state.checkout.process_checkout(user.user_id).await.unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));

    // A cart with no lines.
    cart_service::list_cart(&app.state, &user).await?;
    let err = app.state.checkout.process_checkout(user.user_id).await.unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));
    assert_eq!(err.to_string(), "Cart is empty.");

    assert_eq!(orders_for(&app.state.orm, user.user_id).await?, 0);
    Ok(())
}

#[tokio::test]
async fn all_lines_out_of_stock_fails_without_side_effects() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = new_user();
    let lamp = seed_product(&app.state.orm, "Lamp", "25.00", 2).await?;
    let rug = seed_product(&app.state.orm, "Rug", "80.00", 1).await?;
    add_to_cart(&app.state, &user, &lamp, 2).await?;
    add_to_cart(&app.state, &user, &rug, 1).await?;

    for product in [&lamp, &rug] {
        let mut active: products::ActiveModel = Products::find_by_id(product.id)
            .one(&app.state.orm)
            .await?
            .unwrap()
            .into();
        active.stock_quantity = Set(0);
        active.update(&app.state.orm).await?;
    }

    let err = app.state.checkout.process_checkout(user.user_id).await.unwrap_err();
    match err {
        AppError::InsufficientStock(message) => assert_eq!(message, ALL_OUT_OF_STOCK),
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(orders_for(&app.state.orm, user.user_id).await?, 0);
    let cart = cart_service::list_cart(&app.state, &user).await?.data.unwrap();
    assert_eq!(cart.items.len(), 2);
    Ok(())
}

#[tokio::test]
async fn unavailable_lines_stay_in_the_cart() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = new_user();
    let book = seed_product(&app.state.orm, "Book", "12.00", 5).await?;
    let pen = seed_product(&app.state.orm, "Pen", "3.50", 4).await?;
    add_to_cart(&app.state, &user, &book, 2).await?;
    add_to_cart(&app.state, &user, &pen, 1).await?;

    let mut active: products::ActiveModel = pen.clone().into();
    active.stock_quantity = Set(0);
    active.update(&app.state.orm).await?;

    let receipt = app.state.checkout.process_checkout(user.user_id).await?;

    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.items[0].product_id, book.id);
    assert_eq!(receipt.order.subtotal().to_string(), "24.00");
    assert_eq!(receipt.unavailable.len(), 1);
    assert_eq!(receipt.unavailable[0].product_id, pen.id);

    let cart = cart_service::list_cart(&app.state, &user).await?.data.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product.id, pen.id);
    assert_eq!(stock_of(&app.state.orm, book.id).await?, 3);
    assert_eq!(stock_of(&app.state.orm, pen.id).await?, 0);
    Ok(())
}

#[tokio::test]
async fn soft_deleted_products_are_not_sold() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = new_user();
    let kept = seed_product(&app.state.orm, "Kettle", "40.00", 5).await?;
    let gone = seed_product(&app.state.orm, "Toaster", "30.00", 5).await?;
    add_to_cart(&app.state, &user, &kept, 1).await?;
    add_to_cart(&app.state, &user, &gone, 1).await?;

    let mut active: products::ActiveModel = gone.clone().into();
    active.deleted_at = Set(Some(chrono::Utc::now().into()));
    active.update(&app.state.orm).await?;

    let receipt = app.state.checkout.process_checkout(user.user_id).await?;
    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.unavailable[0].product_id, gone.id);
    assert_eq!(stock_of(&app.state.orm, gone.id).await?, 5);
    Ok(())
}

#[tokio::test]
async fn item_snapshot_survives_product_changes() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = new_user();
    let product = seed_product(&app.state.orm, "Chair", "149.99", 4).await?;
    add_to_cart(&app.state, &user, &product, 1).await?;
    let receipt = app.state.checkout.process_checkout(user.user_id).await?;
    let order_id = receipt.order.id;

    let mut active: products::ActiveModel = Products::find_by_id(product.id)
        .one(&app.state.orm)
        .await?
        .unwrap()
        .into();
    active.name = Set("Renamed Chair".into());
    active.price_cents = Set(1);
    active.update(&app.state.orm).await?;

    let fetched = order_service::get_order(&app.state, &user, order_id)
        .await?
        .data
        .unwrap();
    let item = &fetched.items[0];
    assert_eq!(item.product_name, "Chair");
    assert_eq!(item.price_snapshot.to_string(), "149.99");
    assert_eq!(item.product_image.as_deref(), Some("https://img.test/chair.jpg"));

    Products::delete_by_id(product.id).exec(&app.state.orm).await?;

    let fetched = order_service::get_order(&app.state, &user, order_id)
        .await?
        .data
        .unwrap();
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.items[0].product_name, "Chair");
    assert_eq!(fetched.items[0].subtotal.to_string(), "149.99");
    assert_eq!(fetched.order.formatted_total, "$161.24");
    Ok(())
}

/// Writes the order, then fails while writing its items.
struct BrokenItems(SeaOrderStore);

#[async_trait]
impl OrderStore for BrokenItems {
    async fn create(&self, txn: &DatabaseTransaction, draft: OrderDraft) -> AppResult<orders::Model> {
        self.0.create(txn, draft).await
    }

    async fn create_items(
        &self,
        _txn: &DatabaseTransaction,
        _order_id: Uuid,
        _items: Vec<OrderItemDraft>,
    ) -> AppResult<Vec<order_items::Model>> {
        Err(AppError::Internal(anyhow::anyhow!("disk full")))
    }
}

#[tokio::test]
async fn failure_mid_checkout_rolls_everything_back() -> anyhow::Result<()> {
    let orm = common::connect().await?;
    let user = new_user();
    let product = seed_product(&orm, "Vase", "20.00", 6).await?;

    let state = storefront_checkout::state::AppState::new(
        orm.clone(),
        CheckoutSettings::default(),
        Arc::new(RecordingNotifier::default()),
    );
    add_to_cart(&state, &user, &product, 2).await?;

    let broken = CheckoutService::with_stores(
        orm.clone(),
        CheckoutSettings::default(),
        SeaCartStore,
        SeaProductStore,
        BrokenItems(SeaOrderStore::default()),
        Arc::new(RecordingNotifier::default()),
    );
    let err = broken.process_checkout(user.user_id).await.unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));

    assert_eq!(orders_for(&orm, user.user_id).await?, 0);
    assert_eq!(OrderItems::find().filter(order_items::Column::ProductId.eq(product.id)).count(&orm).await?, 0);
    assert_eq!(stock_of(&orm, product.id).await?, 6);
    let cart = cart_service::list_cart(&state, &user).await?.data.unwrap();
    assert_eq!(cart.item_count, 2);
    Ok(())
}

#[tokio::test]
async fn crossing_the_threshold_raises_one_alert_after_commit() -> anyhow::Result<()> {
    let app = setup_with(CheckoutSettings {
        low_stock_threshold: 5,
        ..Default::default()
    })
    .await?;
    let user = new_user();
    let crossing = seed_product(&app.state.orm, "Candle", "9.00", 6).await?;
    let plenty = seed_product(&app.state.orm, "Soap", "4.00", 50).await?;
    let already_low = seed_product(&app.state.orm, "Matches", "1.00", 3).await?;
    add_to_cart(&app.state, &user, &crossing, 2).await?;
    add_to_cart(&app.state, &user, &plenty, 1).await?;
    add_to_cart(&app.state, &user, &already_low, 1).await?;

    app.state.checkout.process_checkout(user.user_id).await?;

    let alerts = app.notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].product_id, crossing.id);
    assert_eq!(alerts[0].stock_remaining, 4);
    assert_eq!(alerts[0].threshold, 5);
    Ok(())
}

/// Serves each cart line as two half-lines of the same product.
struct SplitLines;

#[async_trait]
impl CartStore for SplitLines {
    async fn find_cart_id(
        &self,
        txn: &DatabaseTransaction,
        user_id: Uuid,
    ) -> AppResult<Option<Uuid>> {
        SeaCartStore.find_cart_id(txn, user_id).await
    }

    async fn lines(&self, txn: &DatabaseTransaction, cart_id: Uuid) -> AppResult<Vec<CartLine>> {
        let mut split = Vec::new();
        for line in SeaCartStore.lines(txn, cart_id).await? {
            let half = line.quantity / 2;
            split.push(CartLine {
                quantity: line.quantity - half,
                ..line
            });
            split.push(CartLine {
                id: Uuid::new_v4(),
                quantity: half,
                ..line
            });
        }
        Ok(split)
    }

    async fn remove_lines(
        &self,
        txn: &DatabaseTransaction,
        cart_id: Uuid,
        line_ids: &[Uuid],
    ) -> AppResult<u64> {
        SeaCartStore.remove_lines(txn, cart_id, line_ids).await
    }
}

#[tokio::test]
async fn lines_sharing_a_product_cross_the_threshold_once() -> anyhow::Result<()> {
    let orm = common::connect().await?;
    let state = storefront_checkout::state::AppState::new(
        orm.clone(),
        CheckoutSettings::default(),
        Arc::new(RecordingNotifier::default()),
    );
    let user = new_user();
    let product = seed_product(&orm, "Mug", "8.00", 12).await?;
    add_to_cart(&state, &user, &product, 4).await?;

    let notifier = Arc::new(RecordingNotifier::default());
    let checkout = CheckoutService::with_stores(
        orm.clone(),
        CheckoutSettings {
            low_stock_threshold: 10,
            ..Default::default()
        },
        SplitLines,
        SeaProductStore,
        SeaOrderStore::default(),
        notifier.clone(),
    );
    let receipt = checkout.process_checkout(user.user_id).await?;
    assert_eq!(receipt.items.len(), 2);
    assert_eq!(stock_of(&orm, product.id).await?, 8);

    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].stock_remaining, 10);
    Ok(())
}

#[tokio::test]
async fn failed_checkout_sends_no_alerts() -> anyhow::Result<()> {
    let app = setup_with(CheckoutSettings {
        low_stock_threshold: 5,
        ..Default::default()
    })
    .await?;
    let user = new_user();
    let err = app.state.checkout.process_checkout(user.user_id).await.unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));
    assert!(app.notifier.alerts().is_empty());
    Ok(())
}

#[tokio::test]
async fn configured_discount_lands_after_vat() -> anyhow::Result<()> {
    let app = setup_with(CheckoutSettings {
        discount: Some(FixedDiscount {
            amount: "5.00".parse()?,
            label: "Spring sale".into(),
        }),
        ..Default::default()
    })
    .await?;
    let user = new_user();
    let product = seed_product(&app.state.orm, "Plant", "100.00", 3).await?;
    add_to_cart(&app.state, &user, &product, 1).await?;

    let receipt = app.state.checkout.process_checkout(user.user_id).await?;
    assert_eq!(receipt.order.total().to_string(), "102.50");
    let keys: Vec<_> = receipt
        .order
        .pricing_breakdown
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["key"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(keys, ["vat", "discount"]);
    assert_eq!(receipt.order.pricing_breakdown[1]["amount"], "-5.00");
    Ok(())
}

#[tokio::test]
async fn pending_orders_can_be_cancelled_once() -> anyhow::Result<()> {
    let app = setup_with(CheckoutSettings {
        initial_status: OrderStatus::Pending,
        ..Default::default()
    })
    .await?;
    let user = new_user();
    let product = seed_product(&app.state.orm, "Scarf", "22.00", 3).await?;
    add_to_cart(&app.state, &user, &product, 1).await?;
    let receipt = app.state.checkout.process_checkout(user.user_id).await?;
    assert_eq!(receipt.order.status, OrderStatus::Pending);

    let cancelled = order_service::cancel_order(&app.state, &user, receipt.order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);

    let err = order_service::complete_order(&app.state, &user, receipt.order.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidStatusTransition {
            from: OrderStatus::Cancelled,
            to: OrderStatus::Completed
        }
    ));

    // Someone else's order is invisible.
    let stranger = new_user();
    let err = order_service::cancel_order(&app.state, &stranger, receipt.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn list_orders_filters_by_status() -> anyhow::Result<()> {
    let app = setup_with(CheckoutSettings {
        initial_status: OrderStatus::Pending,
        ..Default::default()
    })
    .await?;
    let user = new_user();
    let product = seed_product(&app.state.orm, "Notebook", "6.00", 10).await?;

    let mut ids = Vec::new();
    for _ in 0..3 {
        add_to_cart(&app.state, &user, &product, 1).await?;
        ids.push(app.state.checkout.process_checkout(user.user_id).await?.order.id);
    }
    order_service::complete_order(&app.state, &user, ids[0]).await?;

    let all = order_service::list_orders(&app.state, &user, Default::default()).await?;
    assert_eq!(all.meta.unwrap().total, Some(3));

    let pending = order_service::list_orders(
        &app.state,
        &user,
        storefront_checkout::routes::params::OrderListQuery {
            status: Some(OrderStatus::Pending),
            ..Default::default()
        },
    )
    .await?;
    let items = pending.data.unwrap().items;
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|o| o.status == OrderStatus::Pending));
    assert_eq!(stock_of(&app.state.orm, product.id).await?, 7);
    Ok(())
}
