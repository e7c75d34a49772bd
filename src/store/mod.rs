pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{AggregateDelta, Cart, LineItem, Order, OrderCart, OrderLineItem, OrderStatus},
};

/// The line-item half of a cart mutation, applied together with its
/// aggregate delta in [`CartStore::apply_line_delta`].
#[derive(Debug, Clone)]
pub enum LineWrite {
    /// Inserts the line, or when the product is already in the cart adds the
    /// line's quantity to the stored row while keeping the stored row's
    /// first-add descriptive and unit fields.
    Upsert(LineItem),
    Reduce { product_id: Uuid, by: i32 },
    Delete { product_id: Uuid },
}

/// Persistence seam for carts and their line items.
///
/// Quantity and aggregate updates are expressed as relative deltas so that
/// concurrent mutations on the same cart commute instead of overwriting each
/// other.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn create(&self, cart: &Cart) -> AppResult<()>;

    /// The aggregate row alone, without line items.
    async fn cart(&self, cart_id: Uuid) -> AppResult<Option<Cart>>;

    async fn line_items(&self, cart_id: Uuid) -> AppResult<Vec<LineItem>>;

    async fn line_item(&self, cart_id: Uuid, product_id: Uuid) -> AppResult<Option<LineItem>>;

    /// Applies a line write and its relative aggregate update
    /// (`counter = counter + n`, ...) as one unit of work: either both land
    /// or neither does, so `counter == Σ quantity` survives a storage
    /// failure mid-mutation.
    async fn apply_line_delta(
        &self,
        cart_id: Uuid,
        write: LineWrite,
        delta: &AggregateDelta,
    ) -> AppResult<()>;

    /// Deletes every line item and zeroes the aggregate. Idempotent.
    async fn reset(&self, cart_id: Uuid) -> AppResult<()>;
}

/// An order together with its frozen cart and line-item snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderRecord {
    pub order: Order,
    pub cart: OrderCart,
    pub line_items: Vec<OrderLineItem>,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists the order row and both snapshots in one unit of work; a
    /// partial write here is corruption, not a recoverable state.
    async fn create(&self, record: &OrderRecord) -> AppResult<()>;

    /// Settlement write, conditional on the order still being pending.
    async fn settle(&self, order_id: Uuid, status: OrderStatus) -> AppResult<()>;

    async fn order(&self, order_id: Uuid) -> AppResult<Option<OrderRecord>>;

    /// The user's orders, newest first.
    async fn orders_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<OrderRecord>>;

    async fn count_by_user(&self, user_id: Uuid) -> AppResult<i64>;
}
