use crate::domain::error_code::ErrorCode;
use crate::domain::ports::{
    ActivityResult, BillingClient, BillingClientRef, BillingConnector, Surface, SurfaceHandle,
    SurfaceListener, TransientUiHost,
};
use crate::domain::product::{ProductDetails, ProductListing};
use crate::domain::purchase::DEFAULT_STORE;
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;

/// A product on sale in the in-memory store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogEntry {
    pub sku: String,
    pub price: Decimal,
    pub currency: String,
    #[serde(default)]
    pub title: String,
}

/// What the simulated user does in the store dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseDecision {
    #[default]
    Approve,
    Decline,
}

#[derive(Default)]
struct BillingState {
    catalog: HashMap<String, CatalogEntry>,
    /// Unconsumed purchases, by consumption token.
    owned: HashMap<String, String>,
    decision: PurchaseDecision,
    next_order: u64,
    unavailable: Option<String>,
    detail_queries: usize,
    purchases_launched: usize,
}

/// A billing SDK backed by an in-memory catalog.
///
/// Like the platform store, a product must be consumed before it can be
/// bought again.
#[derive(Default, Clone)]
pub struct InMemoryBillingClient {
    state: Arc<RwLock<BillingState>>,
    activity_results: Arc<AtomicUsize>,
    request_code: Option<i32>,
}

impl InMemoryBillingClient {
    /// Creates a store selling the given products.
    pub fn new(catalog: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let state = BillingState {
            catalog: catalog
                .into_iter()
                .map(|entry| (entry.sku.clone(), entry))
                .collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
            ..Default::default()
        }
    }

    /// Only activity results carrying this code are recognized.
    pub fn with_request_code(mut self, request_code: i32) -> Self {
        self.request_code = Some(request_code);
        self
    }

    /// Makes the SDK setup fail with the given diagnostic.
    pub async fn set_unavailable(&self, reason: Option<String>) {
        self.state.write().await.unavailable = reason;
    }

    /// Sets the user's answer in the purchase dialogs that follow. Approves by default.
    pub async fn set_decision(&self, decision: PurchaseDecision) {
        self.state.write().await.decision = decision;
    }

    pub async fn owned_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.state.read().await.owned.keys().cloned().collect();
        tokens.sort();
        tokens
    }

    pub async fn detail_queries(&self) -> usize {
        self.state.read().await.detail_queries
    }

    pub async fn purchases_launched(&self) -> usize {
        self.state.read().await.purchases_launched
    }

    pub fn activity_results(&self) -> usize {
        self.activity_results.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BillingClient for InMemoryBillingClient {
    async fn fetch_product_details(&self, skus: &[String]) -> Result<Value> {
        let mut state = self.state.write().await;
        state.detail_queries += 1;

        let products = skus
            .iter()
            .filter_map(|sku| state.catalog.get(sku))
            .map(|entry| {
                let mut extra = Map::new();
                extra.insert("title".to_string(), Value::String(entry.title.clone()));
                ProductDetails {
                    internal_product_id: entry.sku.clone(),
                    product_id: None,
                    price: entry.price,
                    currency: entry.currency.clone(),
                    extra,
                }
            })
            .collect();

        serde_json::to_value(ProductListing { products })
            .map_err(|e| StoreError::Internal(format!("Encoding product details: {e}")))
    }

    async fn launch_purchase(
        &self,
        _surface: SurfaceHandle,
        _request_code: i32,
        sku: &str,
    ) -> Result<Value> {
        let mut state = self.state.write().await;
        state.purchases_launched += 1;

        if !state.catalog.contains_key(sku) {
            return Err(StoreError::sdk(
                ErrorCode::BadParameters,
                format!("Item unavailable: {sku}"),
            ));
        }
        if state.owned.values().any(|owned| owned == sku) {
            return Err(StoreError::sdk(
                ErrorCode::LogicError,
                format!("Item already owned: {sku}"),
            ));
        }
        if state.decision == PurchaseDecision::Decline {
            return Err(StoreError::sdk(ErrorCode::Canceled, "User canceled"));
        }

        state.next_order += 1;
        let order_id = format!("GPA.{:04}", state.next_order);
        let token = format!("token-{sku}-{}", state.next_order);
        state.owned.insert(token.clone(), sku.to_string());

        let receipt = json!({
            "orderId": order_id,
            "productId": sku,
            "purchaseToken": token,
        });
        Ok(json!({
            "store": DEFAULT_STORE,
            "internalProductId": sku,
            "token": token,
            "receipt": receipt.to_string(),
        }))
    }

    async fn consume_purchase(&self, sku: &str, token: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.owned.get(token).is_some_and(|owned| owned == sku) {
            state.owned.remove(token);
            Ok(())
        } else {
            Err(StoreError::sdk(
                ErrorCode::LogicError,
                format!("Item not owned: {sku}"),
            ))
        }
    }

    fn handle_activity_result(&self, result: &ActivityResult) -> bool {
        let recognized = self
            .request_code
            .is_none_or(|code| code == result.request_code);
        if recognized {
            self.activity_results.fetch_add(1, Ordering::SeqCst);
        }
        recognized
    }
}

#[async_trait]
impl BillingConnector for InMemoryBillingClient {
    async fn connect(&self) -> std::result::Result<BillingClientRef, String> {
        match &self.state.read().await.unavailable {
            Some(reason) => Err(reason.clone()),
            None => Ok(Arc::new(self.clone())),
        }
    }
}

/// How the simulated host screen behaves once shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiBehavior {
    /// Reports ready and stays up until asked to close.
    #[default]
    Complete,
    /// The user backs out before the store dialog appears.
    Dismiss,
}

struct InMemorySurface {
    listener: Arc<dyn SurfaceListener>,
    closed: AtomicBool,
}

impl Surface for InMemorySurface {
    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.listener.on_closed();
        }
    }
}

/// A UI host that runs surfaces synchronously, following the configured behavior.
#[derive(Default, Clone)]
pub struct InMemoryUiHost {
    behavior: Arc<Mutex<UiBehavior>>,
    shown: Arc<AtomicUsize>,
}

impl InMemoryUiHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the behavior of the surfaces shown from now on. Surfaces complete by default.
    pub fn set_behavior(&self, behavior: UiBehavior) {
        *self.behavior.lock().unwrap_or_else(PoisonError::into_inner) = behavior;
    }

    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }
}

impl TransientUiHost for InMemoryUiHost {
    fn show(&self, listener: Arc<dyn SurfaceListener>) -> std::result::Result<(), String> {
        self.shown.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.behavior.lock().unwrap_or_else(PoisonError::into_inner);

        let surface = Arc::new(InMemorySurface {
            listener: Arc::clone(&listener),
            closed: AtomicBool::new(false),
        });
        match behavior {
            UiBehavior::Complete => listener.on_ready(surface),
            UiBehavior::Dismiss => surface.close(),
        }
        Ok(())
    }
}
