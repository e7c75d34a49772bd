use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Invalidation target for the denormalized cart view kept by the read path.
///
/// The cache is never authoritative; a failed invalidation is logged by the
/// caller and swallowed, because a stale cache entry is an acceptable
/// degradation while a failed cart mutation is not.
#[async_trait]
pub trait CartCache: Send + Sync {
    async fn invalidate(&self, cart_id: Uuid) -> anyhow::Result<()>;
}

#[derive(Default)]
struct InMemoryCacheState {
    keys: HashSet<Uuid>,
    failing: bool,
}

/// Process-local cache used in development and tests.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    state: Arc<RwLock<InMemoryCacheState>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent invalidation fail, for exercising the
    /// best-effort path.
    pub async fn set_failing(&self, failing: bool) {
        self.state.write().await.failing = failing;
    }

    pub async fn put(&self, cart_id: Uuid) {
        self.state.write().await.keys.insert(cart_id);
    }

    pub async fn contains(&self, cart_id: Uuid) -> bool {
        self.state.read().await.keys.contains(&cart_id)
    }
}

#[async_trait]
impl CartCache for InMemoryCache {
    async fn invalidate(&self, cart_id: Uuid) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        if state.failing {
            anyhow::bail!("cache unavailable");
        }
        state.keys.remove(&cart_id);
        Ok(())
    }
}
