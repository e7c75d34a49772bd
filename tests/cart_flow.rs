use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use shopping_api::{
    cache::InMemoryCache,
    dto::cart::NewLineItem,
    error::{AppError, AppResult},
    models::{AggregateDelta, Cart, LineItem},
    services::{CartService, cart_service::LineItemFilter},
    store::{CartStore, LineWrite, memory::InMemoryCartStore},
};

fn service() -> (CartService, InMemoryCache) {
    let cache = InMemoryCache::new();
    let service = CartService::new(
        Arc::new(InMemoryCartStore::new()),
        Arc::new(cache.clone()),
    );
    (service, cache)
}

fn product(brand: &str, subtotal: i64, tax_rate: i64, discount_rate: i64) -> NewLineItem {
    NewLineItem {
        product_id: Uuid::new_v4(),
        brand: brand.to_string(),
        category: "electronics".to_string(),
        kind: "gadget".to_string(),
        description: String::new(),
        weight: 250,
        subtotal,
        tax_rate,
        discount_rate,
    }
}

async fn assert_invariants(service: &CartService, cart_id: Uuid) -> Cart {
    let (cart, lines) = service.get(cart_id).await.expect("cart");
    let quantity_sum: i32 = lines.iter().map(|l| l.quantity).sum();
    assert_eq!(cart.counter, quantity_sum);
    assert_eq!(cart.total, cart.subtotal + cart.taxes - cart.discount);
    assert_eq!(cart.subtotal, lines.iter().map(|l| l.line_subtotal()).sum::<i64>());
    assert_eq!(cart.taxes, lines.iter().map(|l| l.line_taxes()).sum::<i64>());
    assert_eq!(cart.discount, lines.iter().map(|l| l.line_discount()).sum::<i64>());
    assert_eq!(cart.weight, lines.iter().map(|l| l.line_weight()).sum::<i64>());
    cart
}

#[tokio::test]
async fn aggregate_invariant_holds_after_every_mutation() {
    let (service, _) = service();
    let cart = service.create().await.unwrap();

    let a = product("acme", 40_000, 15, 6);
    let b = product("globex", 33_333, 7, 3);

    service.add(cart.id, a.clone(), 3).await.unwrap();
    assert_invariants(&service, cart.id).await;

    service.add(cart.id, b.clone(), 2).await.unwrap();
    assert_invariants(&service, cart.id).await;

    // Same product again merges into the existing line
    service.add(cart.id, a.clone(), 1).await.unwrap();
    let aggregate = assert_invariants(&service, cart.id).await;
    assert_eq!(aggregate.counter, 6);

    let (_, lines) = service.get(cart.id).await.unwrap();
    assert_eq!(lines.len(), 2);

    service.remove(cart.id, b.product_id, 1).await.unwrap();
    assert_invariants(&service, cart.id).await;

    service.remove(cart.id, a.product_id, 4).await.unwrap();
    let aggregate = assert_invariants(&service, cart.id).await;
    assert_eq!(aggregate.counter, 1);
}

#[tokio::test]
async fn add_then_remove_restores_the_exact_pre_add_aggregate() {
    let (service, _) = service();
    let cart = service.create().await.unwrap();

    let base = product("acme", 40_000, 15, 6);
    service.add(cart.id, base.clone(), 2).await.unwrap();
    let (before, _) = service.get(cart.id).await.unwrap();

    // Odd subtotal and rates so truncation actually happens
    let item = product("globex", 33_337, 13, 7);
    service.add(cart.id, item.clone(), 5).await.unwrap();
    service.remove(cart.id, item.product_id, 5).await.unwrap();

    let (after, lines) = service.get(cart.id).await.unwrap();
    assert_eq!(after, before);
    assert_eq!(lines.len(), 1);
}

#[tokio::test]
async fn concurrent_adds_on_the_same_cart_lose_nothing() {
    let (service, _) = service();
    let cart = service.create().await.unwrap();

    let a = product("acme", 1_000, 10, 0);
    let b = product("globex", 2_000, 20, 5);

    let s1 = service.clone();
    let s2 = service.clone();
    let cart_id = cart.id;
    let t1 = tokio::spawn(async move { s1.add(cart_id, a, 3).await });
    let t2 = tokio::spawn(async move { s2.add(cart_id, b, 5).await });
    t1.await.unwrap().unwrap();
    t2.await.unwrap().unwrap();

    let aggregate = assert_invariants(&service, cart.id).await;
    assert_eq!(aggregate.counter, 8);
}

#[tokio::test]
async fn removing_more_than_held_fails_and_changes_nothing() {
    let (service, _) = service();
    let cart = service.create().await.unwrap();

    let item = product("acme", 5_000, 10, 0);
    service.add(cart.id, item.clone(), 2).await.unwrap();
    let (before, before_lines) = service.get(cart.id).await.unwrap();

    let err = service.remove(cart.id, item.product_id, 3).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::QuantityExceeded {
            requested: 3,
            held: 2
        }
    ));

    let (after, after_lines) = service.get(cart.id).await.unwrap();
    assert_eq!(after, before);
    assert_eq!(after_lines, before_lines);
}

#[tokio::test]
async fn removing_the_entire_contents_is_a_reset() {
    let (service, _) = service();
    let cart = service.create().await.unwrap();

    let item = product("acme", 33_337, 13, 7);
    service.add(cart.id, item.clone(), 4).await.unwrap();
    service.remove(cart.id, item.product_id, 4).await.unwrap();

    let (after, lines) = service.get(cart.id).await.unwrap();
    assert_eq!(after, Cart::empty(cart.id));
    assert!(lines.is_empty());

    // Reset on an already empty cart is fine
    service.reset(cart.id).await.unwrap();
}

#[tokio::test]
async fn zero_or_negative_quantities_are_rejected() {
    let (service, _) = service();
    let cart = service.create().await.unwrap();

    let item = product("acme", 5_000, 10, 0);
    let err = service.add(cart.id, item.clone(), 0).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    service.add(cart.id, item.clone(), 1).await.unwrap();
    let err = service.remove(cart.id, item.product_id, -1).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));
}

#[tokio::test]
async fn unknown_cart_ids_are_not_found() {
    let (service, _) = service();
    let missing = Uuid::new_v4();

    assert!(matches!(service.get(missing).await, Err(AppError::NotFound)));
    assert!(matches!(service.size(missing).await, Err(AppError::NotFound)));
    assert!(matches!(
        service.checkout(missing).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn checkout_quotes_without_mutating() {
    let (service, _) = service();
    let cart = service.create().await.unwrap();

    let item = product("acme", 40_000, 15, 6);
    service.add(cart.id, item, 3).await.unwrap();
    let (before, _) = service.get(cart.id).await.unwrap();

    let quote = service.checkout(cart.id).await.unwrap();
    assert_eq!(quote, before.total + before.taxes - before.discount);

    let (after, _) = service.get(cart.id).await.unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn cache_failure_never_fails_the_mutation() {
    let (service, cache) = service();
    let cart = service.create().await.unwrap();
    cache.set_failing(true).await;

    let item = product("acme", 5_000, 10, 0);
    service.add(cart.id, item.clone(), 2).await.unwrap();
    service.remove(cart.id, item.product_id, 1).await.unwrap();
    service.reset(cart.id).await.unwrap();
}

#[tokio::test]
async fn cache_entry_is_invalidated_on_mutation() {
    let (service, cache) = service();
    let cart = service.create().await.unwrap();

    cache.put(cart.id).await;
    service.add(cart.id, product("acme", 5_000, 10, 0), 1).await.unwrap();
    assert!(!cache.contains(cart.id).await);
}

#[tokio::test]
async fn filters_are_a_closed_enumeration() {
    let (service, _) = service();
    let cart = service.create().await.unwrap();

    service.add(cart.id, product("acme", 40_000, 15, 6), 1).await.unwrap();
    service.add(cart.id, product("globex", 1_000, 0, 0), 2).await.unwrap();

    let filter = LineItemFilter::from_query("brand", Some("ACME"), None, None).unwrap();
    let matches = service.filter(cart.id, &filter).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].brand, "acme");

    let filter = LineItemFilter::from_query("total", None, Some(1_500), Some(3_000)).unwrap();
    let matches = service.filter(cart.id, &filter).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].brand, "globex");

    let err = LineItemFilter::from_query("price; DROP TABLE carts", None, None, None).unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    let err = LineItemFilter::from_query("subtotal", None, Some(10), Some(1)).unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));
}

#[tokio::test]
async fn rate_range_filters_match_on_scaled_line_amounts() {
    let (service, _) = service();
    let cart = service.create().await.unwrap();

    // acme: taxes 6_000, discount 2_400 per unit; globex: both zero
    service.add(cart.id, product("acme", 40_000, 15, 6), 1).await.unwrap();
    service.add(cart.id, product("globex", 1_000, 0, 0), 2).await.unwrap();

    let filter = LineItemFilter::from_query("taxes", None, Some(1), Some(10_000)).unwrap();
    let matches = service.filter(cart.id, &filter).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].brand, "acme");

    let filter = LineItemFilter::from_query("discount", None, Some(0), Some(0)).unwrap();
    let matches = service.filter(cart.id, &filter).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].brand, "globex");
}

/// Cart store whose combined line/aggregate write can be switched to fail.
#[derive(Clone)]
struct FlakyWriteStore {
    inner: InMemoryCartStore,
    fail_writes: Arc<AtomicBool>,
}

impl FlakyWriteStore {
    fn new() -> Self {
        Self {
            inner: InMemoryCartStore::new(),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CartStore for FlakyWriteStore {
    async fn create(&self, cart: &Cart) -> AppResult<()> {
        self.inner.create(cart).await
    }

    async fn cart(&self, cart_id: Uuid) -> AppResult<Option<Cart>> {
        self.inner.cart(cart_id).await
    }

    async fn line_items(&self, cart_id: Uuid) -> AppResult<Vec<LineItem>> {
        self.inner.line_items(cart_id).await
    }

    async fn line_item(&self, cart_id: Uuid, product_id: Uuid) -> AppResult<Option<LineItem>> {
        self.inner.line_item(cart_id, product_id).await
    }

    async fn apply_line_delta(
        &self,
        cart_id: Uuid,
        write: LineWrite,
        delta: &AggregateDelta,
    ) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("storage offline")));
        }
        self.inner.apply_line_delta(cart_id, write, delta).await
    }

    async fn reset(&self, cart_id: Uuid) -> AppResult<()> {
        self.inner.reset(cart_id).await
    }
}

#[tokio::test]
async fn failed_mutations_leave_no_partial_state() {
    let store = FlakyWriteStore::new();
    let service = CartService::new(Arc::new(store.clone()), Arc::new(InMemoryCache::new()));
    let cart = service.create().await.unwrap();

    let item = product("acme", 40_000, 15, 6);
    service.add(cart.id, item.clone(), 2).await.unwrap();
    let (before, before_lines) = service.get(cart.id).await.unwrap();

    store.set_fail_writes(true);
    let extra = product("globex", 1_000, 10, 0);
    service.add(cart.id, extra, 1).await.unwrap_err();
    service.remove(cart.id, item.product_id, 1).await.unwrap_err();

    // Neither the line nor the aggregate side of the failed writes landed
    let after = assert_invariants(&service, cart.id).await;
    assert_eq!(after, before);
    let (_, after_lines) = service.get(cart.id).await.unwrap();
    assert_eq!(after_lines, before_lines);

    store.set_fail_writes(false);
    service.add(cart.id, item, 1).await.unwrap();
    let aggregate = assert_invariants(&service, cart.id).await;
    assert_eq!(aggregate.counter, 3);
}
