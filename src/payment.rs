use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

/// Smallest amount the gateway will bill, in minor units.
pub const MIN_CAPTURE_AMOUNT: i64 = 50;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct Card {
    pub number: String,
    pub exp_month: String,
    pub exp_year: String,
    pub cvc: String,
}

/// A single capture attempt. Amounts are in a currency's smallest unit
/// (100 = 1 USD); order and cart ids ride along as idempotency/audit
/// metadata.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub amount: i64,
    pub currency: String,
    pub card: Card,
    pub metadata: HashMap<String, String>,
}

impl CaptureRequest {
    pub fn new(amount: i64, currency: &str, card: Card, order_id: Uuid, cart_id: Uuid) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("order_id".to_string(), order_id.to_string());
        metadata.insert("cart_id".to_string(), cart_id.to_string());
        Self {
            amount,
            currency: currency.to_string(),
            card,
            metadata,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaptureReceipt {
    pub reference: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("the amount to charge must be at least {MIN_CAPTURE_AMOUNT} minor units")]
    BelowMinimum,

    #[error("{0}")]
    Declined(String),

    #[error("gateway unreachable: {0}")]
    Unavailable(String),
}

/// The single settlement operation the engine consumes. Provider API surface
/// beyond capture (refunds, payouts, intents) lives with the provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn capture(&self, request: CaptureRequest) -> Result<CaptureReceipt, CaptureError>;
}

#[derive(Debug, Default)]
struct StubGatewayState {
    captures: Vec<CaptureRequest>,
    decline: bool,
    next_reference: u32,
}

/// Sandbox gateway: approves everything above the billing minimum and hands
/// out sequential references. Tests flip `set_decline` to exercise the
/// failure path.
#[derive(Clone, Default)]
pub struct StubGateway {
    state: Arc<RwLock<StubGatewayState>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_decline(&self, decline: bool) {
        self.state.write().await.decline = decline;
    }

    pub async fn capture_count(&self) -> usize {
        self.state.read().await.captures.len()
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn capture(&self, request: CaptureRequest) -> Result<CaptureReceipt, CaptureError> {
        if request.amount < MIN_CAPTURE_AMOUNT {
            return Err(CaptureError::BelowMinimum);
        }

        let mut state = self.state.write().await;
        if state.decline {
            return Err(CaptureError::Declined("card declined".to_string()));
        }

        state.next_reference += 1;
        let reference = format!("cap_{:08}", state.next_reference);
        state.captures.push(request);
        Ok(CaptureReceipt { reference })
    }
}
