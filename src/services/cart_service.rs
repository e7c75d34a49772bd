use std::sync::Arc;

use uuid::Uuid;

use crate::{
    cache::CartCache,
    dto::cart::NewLineItem,
    error::{AppError, AppResult},
    models::{Cart, LineItem},
    store::{CartStore, LineWrite},
};

/// Closed set of supported line-item predicates. Unknown field names are
/// rejected at parse time instead of being spliced into a query.
#[derive(Debug, Clone, PartialEq)]
pub enum LineItemFilter {
    Brand(String),
    Category(String),
    Kind(String),
    Subtotal { min: i64, max: i64 },
    Total { min: i64, max: i64 },
    Taxes { min: i64, max: i64 },
    Discount { min: i64, max: i64 },
    Weight { min: i64, max: i64 },
}

impl LineItemFilter {
    pub fn from_query(
        field: &str,
        value: Option<&str>,
        min: Option<i64>,
        max: Option<i64>,
    ) -> AppResult<Self> {
        let text = || {
            value
                .map(str::to_string)
                .ok_or_else(|| AppError::InvalidArgument(format!("filter {field} needs a value")))
        };
        let range = || match (min, max) {
            (Some(min), Some(max)) if min <= max => Ok((min, max)),
            _ => Err(AppError::InvalidArgument(format!(
                "filter {field} needs min and max with min <= max"
            ))),
        };

        match field {
            "brand" => Ok(LineItemFilter::Brand(text()?)),
            "category" => Ok(LineItemFilter::Category(text()?)),
            "kind" => Ok(LineItemFilter::Kind(text()?)),
            "subtotal" => range().map(|(min, max)| LineItemFilter::Subtotal { min, max }),
            "total" => range().map(|(min, max)| LineItemFilter::Total { min, max }),
            "taxes" => range().map(|(min, max)| LineItemFilter::Taxes { min, max }),
            "discount" => range().map(|(min, max)| LineItemFilter::Discount { min, max }),
            "weight" => range().map(|(min, max)| LineItemFilter::Weight { min, max }),
            _ => Err(AppError::InvalidArgument(format!(
                "unknown filter field {field:?}"
            ))),
        }
    }

    fn matches(&self, line: &LineItem) -> bool {
        match self {
            LineItemFilter::Brand(brand) => line.brand.eq_ignore_ascii_case(brand),
            LineItemFilter::Category(category) => line.category.eq_ignore_ascii_case(category),
            LineItemFilter::Kind(kind) => line.kind.eq_ignore_ascii_case(kind),
            LineItemFilter::Subtotal { min, max } => {
                (*min..=*max).contains(&line.line_subtotal())
            }
            LineItemFilter::Total { min, max } => (*min..=*max).contains(&line.line_total()),
            LineItemFilter::Taxes { min, max } => (*min..=*max).contains(&line.line_taxes()),
            LineItemFilter::Discount { min, max } => {
                (*min..=*max).contains(&line.line_discount())
            }
            LineItemFilter::Weight { min, max } => (*min..=*max).contains(&line.line_weight()),
        }
    }
}

/// Owns the cart mutations and keeps the aggregate invariants: the counter
/// matches the summed line quantities and the totals are pointwise sums of
/// per-line contributions.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
    cache: Arc<dyn CartCache>,
}

impl CartService {
    pub fn new(store: Arc<dyn CartStore>, cache: Arc<dyn CartCache>) -> Self {
        Self { store, cache }
    }

    pub async fn create(&self) -> AppResult<Cart> {
        let cart = Cart::empty(Uuid::new_v4());
        self.store.create(&cart).await?;
        Ok(cart)
    }

    pub async fn get(&self, cart_id: Uuid) -> AppResult<(Cart, Vec<LineItem>)> {
        let cart = self.store.cart(cart_id).await?.ok_or(AppError::NotFound)?;
        let lines = self.store.line_items(cart_id).await?;
        Ok((cart, lines))
    }

    /// Adds `quantity` units of a product. A product already in the cart has
    /// its quantity increased; its descriptive and unit fields keep the
    /// first-add snapshot, so the delta is computed from the stored line.
    pub async fn add(&self, cart_id: Uuid, item: NewLineItem, quantity: i32) -> AppResult<Cart> {
        if quantity <= 0 {
            return Err(AppError::InvalidArgument(
                "quantity must be greater than 0".to_string(),
            ));
        }
        if self.store.cart(cart_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let stored = self.store.line_item(cart_id, item.product_id).await?;
        let line = match stored {
            Some(mut existing) => {
                existing.quantity = quantity;
                existing
            }
            None => item.into_line(cart_id, quantity),
        };

        let delta = line.contribution(quantity);
        self.store
            .apply_line_delta(cart_id, LineWrite::Upsert(line), &delta)
            .await?;

        self.invalidate(cart_id).await;
        self.store.cart(cart_id).await?.ok_or(AppError::NotFound)
    }

    /// Takes `quantity` units of a product out of the cart. Removing the
    /// cart's entire contents degenerates to a reset.
    pub async fn remove(&self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> AppResult<()> {
        if quantity <= 0 {
            return Err(AppError::InvalidArgument(
                "quantity must be greater than 0".to_string(),
            ));
        }
        let cart = self.store.cart(cart_id).await?.ok_or(AppError::NotFound)?;
        let line = self
            .store
            .line_item(cart_id, product_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if quantity > line.quantity {
            return Err(AppError::QuantityExceeded {
                requested: quantity,
                held: line.quantity,
            });
        }

        if cart.counter == quantity {
            self.store.reset(cart_id).await?;
        } else {
            let write = if quantity == line.quantity {
                LineWrite::Delete { product_id }
            } else {
                LineWrite::Reduce {
                    product_id,
                    by: quantity,
                }
            };
            let delta = line.contribution(quantity).inverse();
            self.store.apply_line_delta(cart_id, write, &delta).await?;
        }

        self.invalidate(cart_id).await;
        Ok(())
    }

    pub async fn reset(&self, cart_id: Uuid) -> AppResult<()> {
        if self.store.cart(cart_id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        self.store.reset(cart_id).await?;
        self.invalidate(cart_id).await;
        Ok(())
    }

    /// Quote for the current contents. A read, not a commitment.
    pub async fn checkout(&self, cart_id: Uuid) -> AppResult<i64> {
        let cart = self.store.cart(cart_id).await?.ok_or(AppError::NotFound)?;
        Ok(cart.quote())
    }

    pub async fn size(&self, cart_id: Uuid) -> AppResult<i32> {
        let cart = self.store.cart(cart_id).await?.ok_or(AppError::NotFound)?;
        Ok(cart.counter)
    }

    /// Single linear scan over the cart's lines.
    pub async fn filter(
        &self,
        cart_id: Uuid,
        filter: &LineItemFilter,
    ) -> AppResult<Vec<LineItem>> {
        let (_, lines) = self.get(cart_id).await?;
        Ok(lines.into_iter().filter(|l| filter.matches(l)).collect())
    }

    // Best-effort: a stale cache entry is acceptable, a failed mutation is not.
    async fn invalidate(&self, cart_id: Uuid) {
        if let Err(err) = self.cache.invalidate(cart_id).await {
            tracing::warn!(error = %err, %cart_id, "cart cache invalidation failed");
        }
    }
}
