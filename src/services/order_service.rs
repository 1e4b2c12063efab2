use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::orders::{CheckoutResponse, OrderList, OrderWithItems, UnavailableLine},
    entity::{
        OrderItems, OrderStatus, Orders,
        order_items::{Column as OrderItemCol, Model as OrderItemModel},
        orders::{ActiveModel as OrderActive, Column as OrderCol},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{OrderItem, order_from_entity, order_item_from_entity},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

pub async fn checkout(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CheckoutResponse>> {
    let receipt = state.checkout.process_checkout(user.user_id).await?;

    let message = if receipt.unavailable.is_empty() {
        "Checkout success"
    } else {
        "Checkout success; some items were unavailable and remain in your cart"
    };

    Ok(ApiResponse::success(
        message,
        CheckoutResponse {
            order: order_from_entity(receipt.order),
            items: items_from_entities(receipt.items)?,
            unavailable: receipt
                .unavailable
                .into_iter()
                .map(|line| UnavailableLine {
                    cart_item_id: line.id,
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await?;

    let orders = finder
        .limit(limit)
        .offset(offset)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            items: items_from_entities(items)?,
        },
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    transition(state, user, id, OrderStatus::Cancelled).await
}

pub async fn complete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    transition(state, user, id, OrderStatus::Completed).await
}

/// Moves a pending order to a terminal status under a row lock.
async fn transition(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    next: OrderStatus,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if !order.status.can_transition_to(next) {
        return Err(AppError::InvalidStatusTransition {
            from: order.status,
            to: next,
        });
    }

    let mut active: OrderActive = order.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(order_number = %order.order_number, status = %next, "order status changed");
    Ok(ApiResponse::success(
        format!("Order {next}"),
        OrderWithItems {
            order: order_from_entity(order),
            items: items_from_entities(items)?,
        },
        Some(Meta::empty()),
    ))
}

fn items_from_entities(items: Vec<OrderItemModel>) -> AppResult<Vec<OrderItem>> {
    items
        .into_iter()
        .map(|item| order_item_from_entity(item).map_err(AppError::from))
        .collect()
}
