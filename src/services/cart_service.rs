use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartItemDto, CartView, UpdateCartItemRequest},
    entity::{
        CartItems, Carts, Products,
        cart_items::{self, Column as CartItemCol},
        carts::{self, Column as CartCol},
        products::Model as ProductModel,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::product_from_entity,
    money::Money,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn get_or_create_cart<C>(db: &C, user_id: Uuid) -> AppResult<carts::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    if let Some(cart) = Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(db)
        .await?
    {
        return Ok(cart);
    }
    create_cart(db, user_id).await
}

/// Inserts the user's cart, or returns the one a concurrent request created
/// first. The insert runs under a savepoint so losing the race leaves the
/// caller's transaction usable.
pub async fn create_cart<C>(db: &C, user_id: Uuid) -> AppResult<carts::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    let savepoint = db.begin().await?;
    let inserted = carts::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: Set(Utc::now().into()),
    }
    .insert(&savepoint)
    .await;

    match inserted {
        Ok(cart) => {
            savepoint.commit().await?;
            tracing::debug!(%user_id, cart_id = %cart.id, "cart created");
            Ok(cart)
        }
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            savepoint.rollback().await?;
            tracing::debug!(%user_id, "cart created concurrently, reusing it");
            Carts::find()
                .filter(CartCol::UserId.eq(user_id))
                .one(db)
                .await?
                .ok_or(AppError::NotFound)
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn list_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let cart = get_or_create_cart(&state.orm, user.user_id).await?;
    let view = cart_view(&state.orm, cart.id).await?;
    let count = view.items.len() as u64;
    Ok(ApiResponse::success("OK", view, Some(Meta::new(1, count, count))))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;
    let cart = get_or_create_cart(&txn, user.user_id).await?;
    let product = find_live_product(&txn, payload.product_id).await?;

    let existing = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .filter(CartItemCol::ProductId.eq(product.id))
        .one(&txn)
        .await?;

    let new_quantity = existing
        .as_ref()
        .map_or(0, |item| item.quantity)
        .checked_add(payload.quantity)
        .ok_or_else(|| stock_error(&product))?;
    ensure_stock(&product, new_quantity)?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    match existing {
        Some(item) => {
            let mut active: cart_items::ActiveModel = item.into();
            active.quantity = Set(new_quantity);
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }
        None => {
            cart_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product.id),
                quantity: Set(new_quantity),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }
    }

    let view = cart_view(&txn, cart.id).await?;
    txn.commit().await?;

    tracing::info!(user_id = %user.user_id, product_id = %product.id, quantity = new_quantity, "cart updated");
    Ok(ApiResponse::success("Added to cart", view, Some(Meta::empty())))
}

/// Sets a line's quantity; zero or less removes the line.
pub async fn update_quantity(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    let txn = state.orm.begin().await?;
    let (cart, item) = find_own_item(&txn, user.user_id, item_id).await?;

    if payload.quantity <= 0 {
        CartItems::delete_by_id(item.id).exec(&txn).await?;
    } else {
        let product = Products::find_by_id(item.product_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;
        ensure_stock(&product, payload.quantity)?;

        let mut active: cart_items::ActiveModel = item.into();
        active.quantity = Set(payload.quantity);
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;
    }

    let view = cart_view(&txn, cart.id).await?;
    txn.commit().await?;
    Ok(ApiResponse::success("Cart updated", view, Some(Meta::empty())))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let txn = state.orm.begin().await?;
    let (cart, item) = find_own_item(&txn, user.user_id, item_id).await?;
    CartItems::delete_by_id(item.id).exec(&txn).await?;
    let view = cart_view(&txn, cart.id).await?;
    txn.commit().await?;
    Ok(ApiResponse::success("Removed from cart", view, Some(Meta::empty())))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let cart = get_or_create_cart(&state.orm, user.user_id).await?;
    let result = CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&state.orm)
        .await?;
    tracing::info!(user_id = %user.user_id, removed = result.rows_affected, "cart cleared");

    let view = cart_view(&state.orm, cart.id).await?;
    Ok(ApiResponse::success("Cart cleared", view, Some(Meta::empty())))
}

/// Cart lines with their products, oldest first, plus count and total.
pub async fn cart_view<C: ConnectionTrait>(db: &C, cart_id: Uuid) -> AppResult<CartView> {
    let rows = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart_id))
        .order_by_asc(CartItemCol::CreatedAt)
        .order_by_asc(CartItemCol::Id)
        .find_also_related(Products)
        .all(db)
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    let mut item_count: i64 = 0;
    let mut total = Money::ZERO;
    for (item, product) in rows {
        let Some(product) = product else {
            continue;
        };
        let subtotal = product.price().times(item.quantity)?;
        item_count += i64::from(item.quantity);
        total = total.checked_add(subtotal)?;
        items.push(CartItemDto {
            id: item.id,
            product: product_from_entity(product),
            quantity: item.quantity,
            subtotal,
        });
    }

    Ok(CartView {
        id: cart_id,
        items,
        item_count,
        total,
        formatted_total: total.format_price(),
    })
}

async fn find_live_product<C: ConnectionTrait>(db: &C, product_id: Uuid) -> AppResult<ProductModel> {
    Products::find_by_id(product_id)
        .lock(LockType::Update)
        .one(db)
        .await?
        .filter(|p| !p.is_deleted())
        .ok_or_else(|| AppError::BadRequest("product not found".to_string()))
}

async fn find_own_item<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    item_id: Uuid,
) -> AppResult<(carts::Model, cart_items::Model)> {
    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound)?;
    let item = CartItems::find_by_id(item_id)
        .filter(CartItemCol::CartId.eq(cart.id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok((cart, item))
}

fn ensure_stock(product: &ProductModel, quantity: i32) -> AppResult<()> {
    if product.has_stock(quantity) {
        return Ok(());
    }
    Err(stock_error(product))
}

fn stock_error(product: &ProductModel) -> AppError {
    AppError::InsufficientStock(format!(
        "Only {} units available for {}.",
        product.stock_quantity, product.name
    ))
}
