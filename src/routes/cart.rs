use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::cart::{
        AddToCartRequest, CartSize, CartView, CheckoutQuote, LineItemDto, LineItemList,
        LineItemQuery, RemoveQuery,
    },
    error::AppResult,
    response::{ApiResponse, Meta},
    services::cart_service::LineItemFilter,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_cart))
        .route("/{cart_id}", get(get_cart).delete(reset_cart))
        .route("/{cart_id}/items", get(list_items).post(add_to_cart))
        .route("/{cart_id}/items/{product_id}", axum::routing::delete(remove_from_cart))
        .route("/{cart_id}/checkout", get(checkout))
        .route("/{cart_id}/size", get(cart_size))
}

#[utoipa::path(
    post,
    path = "/api/carts",
    responses(
        (status = 200, description = "Create a new empty cart", body = ApiResponse<crate::models::Cart>)
    ),
    tag = "Cart"
)]
pub async fn create_cart(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<crate::models::Cart>>> {
    let cart = state.carts.create().await?;
    Ok(Json(ApiResponse::success("Cart created", cart, None)))
}

#[utoipa::path(
    get,
    path = "/api/carts/{cart_id}",
    params(("cart_id" = Uuid, Path, description = "Cart ID")),
    responses(
        (status = 200, description = "Cart with its line items", body = ApiResponse<CartView>),
        (status = 404, description = "Cart not found"),
    ),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let (cart, lines) = state.carts.get(cart_id).await?;
    Ok(Json(ApiResponse::success(
        "OK",
        CartView::new(cart, lines),
        None,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/carts/{cart_id}",
    params(("cart_id" = Uuid, Path, description = "Cart ID")),
    responses(
        (status = 200, description = "Cart reset to zero", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Cart not found"),
    ),
    tag = "Cart"
)]
pub async fn reset_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    state.carts.reset(cart_id).await?;
    Ok(Json(ApiResponse::success(
        "Cart reset",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/carts/{cart_id}/items",
    params(("cart_id" = Uuid, Path, description = "Cart ID")),
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Updated cart aggregate", body = ApiResponse<crate::models::Cart>),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Cart not found"),
    ),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<crate::models::Cart>>> {
    let cart = state
        .carts
        .add(cart_id, payload.product, payload.quantity)
        .await?;
    Ok(Json(ApiResponse::success("Added to cart", cart, None)))
}

#[utoipa::path(
    delete,
    path = "/api/carts/{cart_id}/items/{product_id}",
    params(
        ("cart_id" = Uuid, Path, description = "Cart ID"),
        ("product_id" = Uuid, Path, description = "Product ID"),
        ("quantity" = i32, Query, description = "Units to remove")
    ),
    responses(
        (status = 200, description = "Removed from cart", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Cart or line item not found"),
        (status = 409, description = "Quantity exceeds held amount"),
    ),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    Path((cart_id, product_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<RemoveQuery>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    state
        .carts
        .remove(cart_id, product_id, query.quantity)
        .await?;
    Ok(Json(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    get,
    path = "/api/carts/{cart_id}/items",
    params(
        ("cart_id" = Uuid, Path, description = "Cart ID"),
        ("field" = Option<String>, Query, description = "Filter field: brand, category, kind, subtotal, total, taxes, discount, weight"),
        ("value" = Option<String>, Query, description = "Value for text filters"),
        ("min" = Option<i64>, Query, description = "Lower bound for range filters"),
        ("max" = Option<i64>, Query, description = "Upper bound for range filters")
    ),
    responses(
        (status = 200, description = "Line items, optionally filtered", body = ApiResponse<LineItemList>),
        (status = 400, description = "Unknown filter field"),
        (status = 404, description = "Cart not found"),
    ),
    tag = "Cart"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
    Query(query): Query<LineItemQuery>,
) -> AppResult<Json<ApiResponse<LineItemList>>> {
    let lines = match query.field.as_deref() {
        Some(field) => {
            let filter =
                LineItemFilter::from_query(field, query.value.as_deref(), query.min, query.max)?;
            state.carts.filter(cart_id, &filter).await?
        }
        None => state.carts.get(cart_id).await?.1,
    };
    let items = lines.into_iter().map(LineItemDto::from).collect();
    Ok(Json(ApiResponse::success("OK", LineItemList { items }, None)))
}

#[utoipa::path(
    get,
    path = "/api/carts/{cart_id}/checkout",
    params(("cart_id" = Uuid, Path, description = "Cart ID")),
    responses(
        (status = 200, description = "Quote for the current contents", body = ApiResponse<CheckoutQuote>),
        (status = 404, description = "Cart not found"),
    ),
    tag = "Cart"
)]
pub async fn checkout(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CheckoutQuote>>> {
    let total = state.carts.checkout(cart_id).await?;
    Ok(Json(ApiResponse::success(
        "OK",
        CheckoutQuote { total },
        None,
    )))
}

#[utoipa::path(
    get,
    path = "/api/carts/{cart_id}/size",
    params(("cart_id" = Uuid, Path, description = "Cart ID")),
    responses(
        (status = 200, description = "Quantity of products in the cart", body = ApiResponse<CartSize>),
        (status = 404, description = "Cart not found"),
    ),
    tag = "Cart"
)]
pub async fn cart_size(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CartSize>>> {
    let counter = state.carts.size(cart_id).await?;
    Ok(Json(ApiResponse::success("OK", CartSize { counter }, None)))
}
