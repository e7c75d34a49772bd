use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Cart, LineItem};

/// Product descriptor snapshotted into the cart when the line is first
/// added. `weight` and `subtotal` are per-unit minor units; the rates are
/// integer percentages of the unit subtotal.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewLineItem {
    pub product_id: Uuid,
    pub brand: String,
    pub category: String,
    pub kind: String,
    #[serde(default)]
    pub description: String,
    pub weight: i64,
    pub subtotal: i64,
    pub tax_rate: i64,
    pub discount_rate: i64,
}

impl NewLineItem {
    pub fn into_line(self, cart_id: Uuid, quantity: i32) -> LineItem {
        LineItem {
            product_id: self.product_id,
            cart_id,
            quantity,
            brand: self.brand,
            category: self.category,
            kind: self.kind,
            description: self.description,
            weight: self.weight,
            subtotal: self.subtotal,
            tax_rate: self.tax_rate,
            discount_rate: self.discount_rate,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product: NewLineItem,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemoveQuery {
    pub quantity: i32,
}

/// Optional filter over a cart's line items; `field` selects the predicate.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LineItemQuery {
    pub field: Option<String>,
    pub value: Option<String>,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

/// A line item with its per-line amounts scaled by quantity.
#[derive(Debug, Serialize, ToSchema)]
pub struct LineItemDto {
    pub product_id: Uuid,
    pub cart_id: Uuid,
    pub quantity: i32,
    pub brand: String,
    pub category: String,
    pub kind: String,
    pub description: String,
    pub weight: i64,
    pub discount: i64,
    pub taxes: i64,
    pub subtotal: i64,
    pub total: i64,
}

impl From<LineItem> for LineItemDto {
    fn from(line: LineItem) -> Self {
        Self {
            weight: line.line_weight(),
            discount: line.line_discount(),
            taxes: line.line_taxes(),
            subtotal: line.line_subtotal(),
            total: line.line_total(),
            product_id: line.product_id,
            cart_id: line.cart_id,
            quantity: line.quantity,
            brand: line.brand,
            category: line.category,
            kind: line.kind,
            description: line.description,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    #[serde(flatten)]
    pub cart: Cart,
    pub line_items: Vec<LineItemDto>,
}

impl CartView {
    pub fn new(cart: Cart, lines: Vec<LineItem>) -> Self {
        Self {
            cart,
            line_items: lines.into_iter().map(LineItemDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LineItemList {
    pub items: Vec<LineItemDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutQuote {
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartSize {
    pub counter: i32,
}
