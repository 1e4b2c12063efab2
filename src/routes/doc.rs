use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{ApiKey, ApiKeyValue, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{AddToCartRequest, CartItemDto, CartView, UpdateCartItemRequest},
        orders::{CheckoutResponse, OrderList, OrderWithItems, UnavailableLine},
    },
    entity::OrderStatus,
    middleware::auth::USER_ID_HEADER,
    models::{Order, OrderItem, Product, ProductImage, ProductSnapshot},
    pricing::{Breakdown, BreakdownEntry},
    response::{ApiResponse, Meta},
    routes::{cart, health, orders, params},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "user_id",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(USER_ID_HEADER))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::cart_list,
        cart::add_to_cart,
        cart::clear_cart,
        cart::update_item,
        cart::remove_item,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::cancel_order,
        orders::complete_order
    ),
    components(
        schemas(
            Product,
            ProductImage,
            ProductSnapshot,
            Order,
            OrderItem,
            OrderStatus,
            Breakdown,
            BreakdownEntry,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemDto,
            CartView,
            CheckoutResponse,
            UnavailableLine,
            OrderList,
            OrderWithItems,
            params::Pagination,
            params::OrderListQuery,
            params::SortOrder,
            Meta,
            ApiResponse<CartView>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("user_id" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout and order endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
