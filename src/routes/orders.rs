use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{OrderList, OrderListQuery, PlaceOrderRequest},
    error::AppResult,
    response::{ApiResponse, Meta},
    state::AppState,
    store::OrderRecord,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(place_order).get(list_orders))
        .route("/{order_id}", get(get_order))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 200, description = "Order settled and paid", body = ApiResponse<OrderRecord>),
        (status = 400, description = "Empty cart or invalid parameters"),
        (status = 402, description = "Payment failed, order marked failed, cart preserved"),
        (status = 404, description = "Cart not found"),
    ),
    tag = "Orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    Json(payload): Json<PlaceOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderRecord>>> {
    let record = state
        .orders
        .place_order(payload.user_id, payload.cart_id, payload.params, payload.card)
        .await?;
    Ok(Json(ApiResponse::success("Order placed", record, None)))
}

#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with its snapshots", body = ApiResponse<OrderRecord>),
        (status = 404, description = "Order not found"),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderRecord>>> {
    let record = state.orders.get(order_id).await?;
    Ok(Json(ApiResponse::success("OK", record, None)))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("user_id" = Uuid, Query, description = "User ID"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "The user's orders, newest first", body = ApiResponse<OrderList>)
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let (page, per_page, offset) = query.pagination.normalize();
    let (items, total) = state
        .orders
        .list_by_user(query.user_id, per_page, offset)
        .await?;
    let meta = Meta::new(page, per_page, total);
    Ok(Json(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(meta),
    )))
}
