use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{AggregateDelta, Cart, LineItem, OrderStatus},
    store::{CartStore, LineWrite, OrderRecord, OrderStore},
};

#[derive(Debug, Clone)]
struct CartEntry {
    cart: Cart,
    lines: HashMap<Uuid, LineItem>,
}

/// In-memory cart store for tests and development. Every mutation happens
/// under one write lock, so deltas apply atomically just like the
/// single-statement relative updates of the Postgres store.
#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<Uuid, CartEntry>>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn create(&self, cart: &Cart) -> AppResult<()> {
        self.carts.write().await.insert(
            cart.id,
            CartEntry {
                cart: cart.clone(),
                lines: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn cart(&self, cart_id: Uuid) -> AppResult<Option<Cart>> {
        Ok(self.carts.read().await.get(&cart_id).map(|e| e.cart.clone()))
    }

    async fn line_items(&self, cart_id: Uuid) -> AppResult<Vec<LineItem>> {
        let carts = self.carts.read().await;
        let entry = carts.get(&cart_id).ok_or(AppError::NotFound)?;
        Ok(entry.lines.values().cloned().collect())
    }

    async fn line_item(&self, cart_id: Uuid, product_id: Uuid) -> AppResult<Option<LineItem>> {
        let carts = self.carts.read().await;
        let entry = carts.get(&cart_id).ok_or(AppError::NotFound)?;
        Ok(entry.lines.get(&product_id).cloned())
    }

    async fn apply_line_delta(
        &self,
        cart_id: Uuid,
        write: LineWrite,
        delta: &AggregateDelta,
    ) -> AppResult<()> {
        // One write lock for both halves: validation happens before any
        // mutation, so a failure leaves the entry untouched.
        let mut carts = self.carts.write().await;
        let entry = carts.get_mut(&cart_id).ok_or(AppError::NotFound)?;

        match write {
            LineWrite::Upsert(line) => {
                entry
                    .lines
                    .entry(line.product_id)
                    .and_modify(|stored| stored.quantity += line.quantity)
                    .or_insert(line);
            }
            LineWrite::Reduce { product_id, by } => {
                let line = entry.lines.get_mut(&product_id).ok_or(AppError::NotFound)?;
                if line.quantity < by {
                    return Err(AppError::NotFound);
                }
                line.quantity -= by;
            }
            LineWrite::Delete { product_id } => {
                entry.lines.remove(&product_id);
            }
        }

        entry.cart.apply(delta);
        Ok(())
    }

    async fn reset(&self, cart_id: Uuid) -> AppResult<()> {
        let mut carts = self.carts.write().await;
        let entry = carts.get_mut(&cart_id).ok_or(AppError::NotFound)?;
        entry.lines.clear();
        entry.cart = Cart::empty(cart_id);
        Ok(())
    }
}

/// In-memory order store for tests and development.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<Uuid, OrderRecord>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, record: &OrderRecord) -> AppResult<()> {
        self.orders
            .write()
            .await
            .insert(record.order.id, record.clone());
        Ok(())
    }

    async fn settle(&self, order_id: Uuid, status: OrderStatus) -> AppResult<()> {
        let mut orders = self.orders.write().await;
        let record = orders.get_mut(&order_id).ok_or(AppError::NotFound)?;
        if !record.order.status.settles_to(status) {
            return Err(AppError::Internal(anyhow::anyhow!(
                "order {order_id} is not pending"
            )));
        }
        record.order.status = status;
        Ok(())
    }

    async fn order(&self, order_id: Uuid) -> AppResult<Option<OrderRecord>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn orders_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<OrderRecord>> {
        let orders = self.orders.read().await;
        let mut records: Vec<OrderRecord> = orders
            .values()
            .filter(|r| r.order.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.order.ordered_at.cmp(&a.order.ordered_at));
        Ok(records
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_by_user(&self, user_id: Uuid) -> AppResult<i64> {
        let orders = self.orders.read().await;
        Ok(orders.values().filter(|r| r.order.user_id == user_id).count() as i64)
    }
}
