use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, AppResult},
    models::{AggregateDelta, Cart, LineItem, Order, OrderCart, OrderLineItem, OrderStatus},
    store::{CartStore, LineWrite, OrderRecord, OrderStore},
};

#[derive(Clone)]
pub struct PgCartStore {
    pool: DbPool,
}

impl PgCartStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn create(&self, cart: &Cart) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO carts (id, counter, weight, discount, taxes, subtotal, total)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(cart.id)
        .bind(cart.counter)
        .bind(cart.weight)
        .bind(cart.discount)
        .bind(cart.taxes)
        .bind(cart.subtotal)
        .bind(cart.total)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn cart(&self, cart_id: Uuid) -> AppResult<Option<Cart>> {
        let cart = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE id = $1")
            .bind(cart_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(cart)
    }

    async fn line_items(&self, cart_id: Uuid) -> AppResult<Vec<LineItem>> {
        let lines =
            sqlx::query_as::<_, LineItem>("SELECT * FROM cart_products WHERE cart_id = $1")
                .bind(cart_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(lines)
    }

    async fn line_item(&self, cart_id: Uuid, product_id: Uuid) -> AppResult<Option<LineItem>> {
        let line = sqlx::query_as::<_, LineItem>(
            "SELECT * FROM cart_products WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(line)
    }

    async fn apply_line_delta(
        &self,
        cart_id: Uuid,
        write: LineWrite,
        delta: &AggregateDelta,
    ) -> AppResult<()> {
        // One transaction for the line write and the aggregate update; a
        // failure on either side rolls both back.
        let mut txn = self.pool.begin().await?;

        match write {
            LineWrite::Upsert(line) => {
                // Relative quantity on conflict: two concurrent adds of the
                // same product both land, and the first-add snapshot fields
                // stay put.
                sqlx::query(
                    r#"
                    INSERT INTO cart_products
                    (product_id, cart_id, quantity, brand, category, kind, description,
                     weight, subtotal, tax_rate, discount_rate)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    ON CONFLICT (cart_id, product_id)
                    DO UPDATE SET quantity = cart_products.quantity + EXCLUDED.quantity
                    "#,
                )
                .bind(line.product_id)
                .bind(line.cart_id)
                .bind(line.quantity)
                .bind(&line.brand)
                .bind(&line.category)
                .bind(&line.kind)
                .bind(&line.description)
                .bind(line.weight)
                .bind(line.subtotal)
                .bind(line.tax_rate)
                .bind(line.discount_rate)
                .execute(&mut *txn)
                .await?;
            }
            LineWrite::Reduce { product_id, by } => {
                let result = sqlx::query(
                    r#"
                    UPDATE cart_products SET quantity = quantity - $3
                    WHERE cart_id = $1 AND product_id = $2 AND quantity >= $3
                    "#,
                )
                .bind(cart_id)
                .bind(product_id)
                .bind(by)
                .execute(&mut *txn)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(AppError::NotFound);
                }
            }
            LineWrite::Delete { product_id } => {
                sqlx::query("DELETE FROM cart_products WHERE cart_id = $1 AND product_id = $2")
                    .bind(cart_id)
                    .bind(product_id)
                    .execute(&mut *txn)
                    .await?;
            }
        }

        let result = sqlx::query(
            r#"
            UPDATE carts SET counter = counter + $2, weight = weight + $3,
                discount = discount + $4, taxes = taxes + $5,
                subtotal = subtotal + $6, total = total + $7
            WHERE id = $1
            "#,
        )
        .bind(cart_id)
        .bind(delta.counter)
        .bind(delta.weight)
        .bind(delta.discount)
        .bind(delta.taxes)
        .bind(delta.subtotal)
        .bind(delta.total)
        .execute(&mut *txn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        txn.commit().await?;
        Ok(())
    }

    async fn reset(&self, cart_id: Uuid) -> AppResult<()> {
        let mut txn = self.pool.begin().await?;

        sqlx::query("DELETE FROM cart_products WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *txn)
            .await?;

        sqlx::query(
            r#"
            UPDATE carts SET counter = 0, weight = 0, discount = 0,
                taxes = 0, subtotal = 0, total = 0
            WHERE id = $1
            "#,
        )
        .bind(cart_id)
        .execute(&mut *txn)
        .await?;

        txn.commit().await?;
        Ok(())
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    cart_id: Uuid,
    currency: String,
    address: String,
    city: String,
    state: String,
    zip_code: String,
    country: String,
    status: String,
    ordered_at: DateTime<Utc>,
    delivery_date: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> AppResult<Order> {
        let status = OrderStatus::parse(&self.status).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("unknown order status {:?}", self.status))
        })?;
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            cart_id: self.cart_id,
            currency: self.currency,
            address: self.address,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            country: self.country,
            status,
            ordered_at: self.ordered_at,
            delivery_date: self.delivery_date,
        })
    }
}

#[derive(Clone)]
pub struct PgOrderStore {
    pool: DbPool,
}

impl PgOrderStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_snapshots(&self, order: Order) -> AppResult<OrderRecord> {
        let cart =
            sqlx::query_as::<_, OrderCart>("SELECT * FROM order_carts WHERE order_id = $1")
                .bind(order.id)
                .fetch_one(&self.pool)
                .await?;

        let line_items = sqlx::query_as::<_, OrderLineItem>(
            "SELECT * FROM order_products WHERE order_id = $1",
        )
        .bind(order.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(OrderRecord {
            order,
            cart,
            line_items,
        })
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, record: &OrderRecord) -> AppResult<()> {
        let mut txn = self.pool.begin().await?;
        let order = &record.order;

        sqlx::query(
            r#"
            INSERT INTO orders
            (id, user_id, cart_id, currency, address, city, state, zip_code,
             country, status, ordered_at, delivery_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.cart_id)
        .bind(&order.currency)
        .bind(&order.address)
        .bind(&order.city)
        .bind(&order.state)
        .bind(&order.zip_code)
        .bind(&order.country)
        .bind(order.status.as_str())
        .bind(order.ordered_at)
        .bind(order.delivery_date)
        .execute(&mut *txn)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO order_carts
            (order_id, counter, weight, discount, taxes, subtotal, total)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.cart.order_id)
        .bind(record.cart.counter)
        .bind(record.cart.weight)
        .bind(record.cart.discount)
        .bind(record.cart.taxes)
        .bind(record.cart.subtotal)
        .bind(record.cart.total)
        .execute(&mut *txn)
        .await?;

        for line in &record.line_items {
            sqlx::query(
                r#"
                INSERT INTO order_products
                (product_id, order_id, quantity, brand, category, kind,
                 description, weight, subtotal, tax_rate, discount_rate)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(line.product_id)
            .bind(line.order_id)
            .bind(line.quantity)
            .bind(&line.brand)
            .bind(&line.category)
            .bind(&line.kind)
            .bind(&line.description)
            .bind(line.weight)
            .bind(line.subtotal)
            .bind(line.tax_rate)
            .bind(line.discount_rate)
            .execute(&mut *txn)
            .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn settle(&self, order_id: Uuid, status: OrderStatus) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE orders SET status = $2 WHERE id = $1 AND status = 'pending'")
                .bind(order_id)
                .bind(status.as_str())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Internal(anyhow::anyhow!(
                "order {order_id} is not pending"
            )));
        }
        Ok(())
    }

    async fn order(&self, order_id: Uuid) -> AppResult<Option<OrderRecord>> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.load_snapshots(row.into_order()?).await?)),
            None => Ok(None),
        }
    }

    async fn orders_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<OrderRecord>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT * FROM orders WHERE user_id = $1
            ORDER BY ordered_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(self.load_snapshots(row.into_order()?).await?);
        }
        Ok(records)
    }

    async fn count_by_user(&self, user_id: Uuid) -> AppResult<i64> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total.0)
    }
}
