use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::orders::OrderParams,
    error::{AppError, AppResult},
    models::{Order, OrderCart, OrderLineItem, OrderStatus},
    payment::{Card, CaptureRequest, PaymentGateway},
    services::CartService,
    store::{OrderRecord, OrderStore},
};

/// Converts a cart into an immutable order snapshot coordinated with a
/// payment capture.
#[derive(Clone)]
pub struct OrderService {
    carts: CartService,
    store: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl OrderService {
    pub fn new(
        carts: CartService,
        store: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            carts,
            store,
            gateway,
        }
    }

    /// Creates the order, captures the payment and settles the result.
    ///
    /// The order row and both snapshots are persisted atomically as pending
    /// before the capture call, which runs without holding anything: the cart
    /// itself is only touched (reset) once the capture succeeded. A declined
    /// or failed capture marks the order failed and leaves the cart intact so
    /// the customer can retry.
    pub async fn place_order(
        &self,
        user_id: Uuid,
        cart_id: Uuid,
        params: OrderParams,
        card: Card,
    ) -> AppResult<OrderRecord> {
        let (cart, lines) = self.carts.get(cart_id).await?;
        if cart.counter == 0 {
            return Err(AppError::EmptyCart);
        }
        let delivery_date = params.validate()?;

        let order_id = Uuid::new_v4();
        let order = Order {
            id: order_id,
            user_id,
            cart_id,
            currency: params.currency,
            address: params.address,
            city: params.city,
            state: params.state,
            zip_code: params.zip_code,
            country: params.country,
            status: OrderStatus::Pending,
            ordered_at: Utc::now(),
            delivery_date,
        };
        let mut record = OrderRecord {
            cart: OrderCart::snapshot(order_id, &cart),
            line_items: lines
                .iter()
                .map(|line| OrderLineItem::snapshot(order_id, line))
                .collect(),
            order,
        };
        self.store.create(&record).await?;

        let request = CaptureRequest::new(
            cart.total,
            &record.order.currency,
            card,
            order_id,
            cart_id,
        );
        match self.gateway.capture(request).await {
            Ok(receipt) => {
                self.store.settle(order_id, OrderStatus::Paid).await?;
                record.order.status = OrderStatus::Paid;
                tracing::info!(%order_id, reference = %receipt.reference, "payment captured");

                // The customer was charged; a stale cart beats re-charging,
                // so a failed reset is a reconciliation anomaly, not an error.
                if let Err(err) = self.carts.reset(cart_id).await {
                    tracing::error!(
                        error = %err, %cart_id, %order_id,
                        "cart reset after successful capture failed, reconcile manually"
                    );
                }
                Ok(record)
            }
            Err(err) => {
                if let Err(settle_err) = self.store.settle(order_id, OrderStatus::Failed).await {
                    tracing::error!(error = %settle_err, %order_id, "failed to mark order failed");
                }
                Err(AppError::PaymentFailed(err.to_string()))
            }
        }
    }

    pub async fn get(&self, order_id: Uuid) -> AppResult<OrderRecord> {
        self.store.order(order_id).await?.ok_or(AppError::NotFound)
    }

    pub async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<OrderRecord>, i64)> {
        let records = self.store.orders_by_user(user_id, limit, offset).await?;
        let total = self.store.count_by_user(user_id).await?;
        Ok((records, total))
    }
}
