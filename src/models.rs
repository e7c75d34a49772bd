use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Running totals derived from a cart's line items.
///
/// Monetary amounts are integer minor units (100 = 1 USD) and weights are
/// grams (1000 = 1kg). After every successful mutation:
/// `counter == Σ line.quantity` and `total == subtotal + taxes - discount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Cart {
    pub id: Uuid,
    pub counter: i32,
    pub weight: i64,
    pub discount: i64,
    pub taxes: i64,
    pub subtotal: i64,
    pub total: i64,
}

impl Cart {
    pub fn empty(id: Uuid) -> Self {
        Self {
            id,
            counter: 0,
            weight: 0,
            discount: 0,
            taxes: 0,
            subtotal: 0,
            total: 0,
        }
    }

    pub fn apply(&mut self, delta: &AggregateDelta) {
        self.counter += delta.counter;
        self.weight += delta.weight;
        self.discount += delta.discount;
        self.taxes += delta.taxes;
        self.subtotal += delta.subtotal;
        self.total += delta.total;
    }

    /// The checkout quote. Read-only, commits to nothing.
    pub fn quote(&self) -> i64 {
        self.total + self.taxes - self.discount
    }
}

/// One product entry inside a cart.
///
/// `weight` and `subtotal` are per-unit amounts; `tax_rate` and
/// `discount_rate` are integer percentages of the unit subtotal. Descriptive
/// fields are copied from the product when it is first added, the cart is a
/// snapshot rather than a live join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LineItem {
    pub product_id: Uuid,
    pub cart_id: Uuid,
    pub quantity: i32,
    pub brand: String,
    pub category: String,
    pub kind: String,
    pub description: String,
    pub weight: i64,
    pub subtotal: i64,
    pub tax_rate: i64,
    pub discount_rate: i64,
}

impl LineItem {
    /// Tax charged per unit. Truncating division, identical on the add and
    /// remove paths so a full add/remove cycle cancels out exactly.
    pub fn unit_taxes(&self) -> i64 {
        self.subtotal * self.tax_rate / 100
    }

    pub fn unit_discount(&self) -> i64 {
        self.subtotal * self.discount_rate / 100
    }

    pub fn unit_total(&self) -> i64 {
        self.subtotal + self.unit_taxes() - self.unit_discount()
    }

    /// The relative change this line contributes to the cart aggregate when
    /// `quantity` units of it are added. Negate for removals.
    pub fn contribution(&self, quantity: i32) -> AggregateDelta {
        let q = quantity as i64;
        AggregateDelta {
            counter: quantity,
            weight: self.weight * q,
            discount: self.unit_discount() * q,
            taxes: self.unit_taxes() * q,
            subtotal: self.subtotal * q,
            total: self.unit_total() * q,
        }
    }

    pub fn line_weight(&self) -> i64 {
        self.weight * self.quantity as i64
    }

    pub fn line_subtotal(&self) -> i64 {
        self.subtotal * self.quantity as i64
    }

    pub fn line_taxes(&self) -> i64 {
        self.unit_taxes() * self.quantity as i64
    }

    pub fn line_discount(&self) -> i64 {
        self.unit_discount() * self.quantity as i64
    }

    pub fn line_total(&self) -> i64 {
        self.unit_total() * self.quantity as i64
    }
}

/// Relative change to a cart aggregate row. Deltas commute, so concurrent
/// mutations on the same cart never lose updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateDelta {
    pub counter: i32,
    pub weight: i64,
    pub discount: i64,
    pub taxes: i64,
    pub subtotal: i64,
    pub total: i64,
}

impl AggregateDelta {
    pub fn inverse(&self) -> Self {
        Self {
            counter: -self.counter,
            weight: -self.weight,
            discount: -self.discount,
            taxes: -self.taxes,
            subtotal: -self.subtotal,
            total: -self.total,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipping,
    Shipped,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "shipping" => Some(OrderStatus::Shipping),
            "shipped" => Some(OrderStatus::Shipped),
            "failed" => Some(OrderStatus::Failed),
            _ => None,
        }
    }

    /// The only transitions the settlement engine performs. Shipping and
    /// shipped are driven by fulfillment, outside this service.
    pub fn settles_to(&self, next: OrderStatus) -> bool {
        matches!(
            (*self, next),
            (OrderStatus::Pending, OrderStatus::Paid)
                | (OrderStatus::Pending, OrderStatus::Failed)
        )
    }
}

/// A purchase request. Immutable once created except for `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cart_id: Uuid,
    pub currency: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
    pub delivery_date: DateTime<Utc>,
}

/// Frozen copy of the cart aggregate at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OrderCart {
    pub order_id: Uuid,
    pub counter: i32,
    pub weight: i64,
    pub discount: i64,
    pub taxes: i64,
    pub subtotal: i64,
    pub total: i64,
}

impl OrderCart {
    pub fn snapshot(order_id: Uuid, cart: &Cart) -> Self {
        Self {
            order_id,
            counter: cart.counter,
            weight: cart.weight,
            discount: cart.discount,
            taxes: cart.taxes,
            subtotal: cart.subtotal,
            total: cart.total,
        }
    }
}

/// Frozen copy of a cart line at order time. Never changes, even if the
/// catalog or the cart do later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OrderLineItem {
    pub product_id: Uuid,
    pub order_id: Uuid,
    pub quantity: i32,
    pub brand: String,
    pub category: String,
    pub kind: String,
    pub description: String,
    pub weight: i64,
    pub subtotal: i64,
    pub tax_rate: i64,
    pub discount_rate: i64,
}

impl OrderLineItem {
    pub fn snapshot(order_id: Uuid, line: &LineItem) -> Self {
        Self {
            product_id: line.product_id,
            order_id,
            quantity: line.quantity,
            brand: line.brand.clone(),
            category: line.category.clone(),
            kind: line.kind.clone(),
            description: line.description.clone(),
            weight: line.weight,
            subtotal: line.subtotal,
            tax_rate: line.tax_rate,
            discount_rate: line.discount_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(subtotal: i64, tax_rate: i64, discount_rate: i64) -> LineItem {
        LineItem {
            product_id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            quantity: 0,
            brand: "b".into(),
            category: "c".into(),
            kind: "k".into(),
            description: String::new(),
            weight: 500,
            subtotal,
            tax_rate,
            discount_rate,
        }
    }

    #[test]
    fn rates_truncate_toward_zero() {
        let l = line(40_000, 15, 6);
        assert_eq!(l.unit_taxes(), 6_000);
        assert_eq!(l.unit_discount(), 2_400);
        assert_eq!(l.unit_total(), 43_600);

        // 4 * 15 / 100 truncates to 0, no hidden rounding up
        let tiny = line(4, 15, 6);
        assert_eq!(tiny.unit_taxes(), 0);
        assert_eq!(tiny.unit_discount(), 0);
        assert_eq!(tiny.unit_total(), 4);
    }

    #[test]
    fn contribution_scales_with_quantity() {
        let l = line(40_000, 15, 6);
        let d = l.contribution(3);
        assert_eq!(d.counter, 3);
        assert_eq!(d.weight, 1_500);
        assert_eq!(d.subtotal, 120_000);
        assert_eq!(d.taxes, 18_000);
        assert_eq!(d.discount, 7_200);
        assert_eq!(d.total, 130_800);
    }

    #[test]
    fn add_then_remove_restores_aggregate_exactly() {
        let l = line(33_333, 7, 3);
        let mut cart = Cart::empty(Uuid::new_v4());
        let before = cart.clone();

        let d = l.contribution(5);
        cart.apply(&d);
        assert_eq!(cart.counter, 5);
        assert_eq!(cart.total, cart.subtotal + cart.taxes - cart.discount);

        cart.apply(&d.inverse());
        assert_eq!(cart, before);
    }

    #[test]
    fn settlement_transitions_are_restricted() {
        assert!(OrderStatus::Pending.settles_to(OrderStatus::Paid));
        assert!(OrderStatus::Pending.settles_to(OrderStatus::Failed));
        assert!(!OrderStatus::Paid.settles_to(OrderStatus::Failed));
        assert!(!OrderStatus::Failed.settles_to(OrderStatus::Paid));
        assert!(!OrderStatus::Pending.settles_to(OrderStatus::Shipping));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Shipping,
            OrderStatus::Shipped,
            OrderStatus::Failed,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("refunded"), None);
    }
}
