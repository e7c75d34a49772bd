use std::sync::Arc;

use crate::{
    cache::CartCache,
    db::DbPool,
    payment::PaymentGateway,
    services::{CartService, OrderService},
    store::{
        postgres::{PgCartStore, PgOrderStore},
        CartStore, OrderStore,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub carts: CartService,
    pub orders: OrderService,
}

impl AppState {
    /// Wires the services with explicit collaborators; tests hand in the
    /// in-memory implementations instead of process-wide handles.
    pub fn new(
        cart_store: Arc<dyn CartStore>,
        order_store: Arc<dyn OrderStore>,
        cache: Arc<dyn CartCache>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let carts = CartService::new(cart_store, cache);
        let orders = OrderService::new(carts.clone(), order_store, gateway);
        Self { carts, orders }
    }

    pub fn with_postgres(
        pool: DbPool,
        cache: Arc<dyn CartCache>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self::new(
            Arc::new(PgCartStore::new(pool.clone())),
            Arc::new(PgOrderStore::new(pool)),
            cache,
            gateway,
        )
    }
}
