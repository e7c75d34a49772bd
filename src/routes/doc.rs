use utoipa::{OpenApi, openapi::OpenApi as OpenApiSpec};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{
            AddToCartRequest, CartSize, CartView, CheckoutQuote, LineItemDto, LineItemList,
            NewLineItem,
        },
        orders::{DeliveryDate, OrderList, OrderParams, PlaceOrderRequest},
    },
    models::{Cart, LineItem, Order, OrderCart, OrderLineItem, OrderStatus},
    payment::Card,
    response::{ApiResponse, Meta},
    routes::{cart, health, orders, params},
    store::OrderRecord,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::create_cart,
        cart::get_cart,
        cart::reset_cart,
        cart::add_to_cart,
        cart::remove_from_cart,
        cart::list_items,
        cart::checkout,
        cart::cart_size,
        orders::place_order,
        orders::get_order,
        orders::list_orders
    ),
    components(
        schemas(
            Cart,
            LineItem,
            Order,
            OrderCart,
            OrderLineItem,
            OrderStatus,
            OrderRecord,
            Card,
            NewLineItem,
            AddToCartRequest,
            CartView,
            CartSize,
            CheckoutQuote,
            LineItemDto,
            LineItemList,
            DeliveryDate,
            OrderParams,
            PlaceOrderRequest,
            OrderList,
            params::Pagination,
            Meta,
            ApiResponse<Cart>,
            ApiResponse<CartView>,
            ApiResponse<OrderRecord>,
            ApiResponse<OrderList>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
