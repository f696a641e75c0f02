#![allow(dead_code)]

use async_trait::async_trait;
use inapp_bridge::domain::ports::{
    ActivityResult, BillingClient, BillingClientRef, BillingConnector, Surface, SurfaceHandle,
    SurfaceListener, TransientUiHost,
};
use inapp_bridge::domain::purchase::{PurchaseOutcome, PurchaseRequest};
use inapp_bridge::error::{Result, StoreError};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, oneshot};

pub const REQUEST_CODE: i32 = 0xC07C;

pub fn coins_request() -> PurchaseRequest {
    PurchaseRequest {
        product_id: "coins".to_string(),
        platform_sku: "gp.coins".to_string(),
    }
}

pub fn coins_details() -> Value {
    json!({
        "products": [
            {"internalProductId": "gp.coins", "price": 0.99, "currency": "EUR", "title": "Coins"}
        ]
    })
}

pub fn coins_record() -> Value {
    json!({
        "store": "googleplay",
        "internalProductId": "gp.coins",
        "token": "tok-coins",
        "receipt": "{\"orderId\":\"GPA.1\"}"
    })
}

/// UI host whose surfaces are driven by the test.
#[derive(Clone, Default)]
pub struct ManualUiHost {
    listener: Arc<Mutex<Option<Arc<dyn SurfaceListener>>>>,
    shown: Arc<Notify>,
    shows: Arc<AtomicUsize>,
    refuse: Arc<AtomicBool>,
    forget: Arc<AtomicBool>,
}

impl ManualUiHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing() -> Self {
        let host = Self::default();
        host.refuse.store(true, Ordering::SeqCst);
        host
    }

    /// A host that accepts the surface, then drops the listener without a word.
    pub fn forgetting() -> Self {
        let host = Self::default();
        host.forget.store(true, Ordering::SeqCst);
        host
    }

    pub fn shows(&self) -> usize {
        self.shows.load(Ordering::SeqCst)
    }

    /// Waits until the coordinator asked for a surface and returns its listener.
    pub async fn wait_shown(&self) -> Arc<dyn SurfaceListener> {
        loop {
            if let Some(listener) = self.listener.lock().unwrap().clone() {
                return listener;
            }
            self.shown.notified().await;
        }
    }
}

impl TransientUiHost for ManualUiHost {
    fn show(&self, listener: Arc<dyn SurfaceListener>) -> std::result::Result<(), String> {
        self.shows.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err("activity could not be started".to_string());
        }
        if self.forget.load(Ordering::SeqCst) {
            return Ok(());
        }
        *self.listener.lock().unwrap() = Some(listener);
        self.shown.notify_one();
        Ok(())
    }
}

/// Surface that counts close requests and, optionally, reports the close back.
pub struct ManualSurface {
    listener: Arc<dyn SurfaceListener>,
    auto_close: bool,
    closed: AtomicBool,
    close_requests: AtomicUsize,
}

impl ManualSurface {
    pub fn new(listener: Arc<dyn SurfaceListener>, auto_close: bool) -> Arc<Self> {
        Arc::new(Self {
            listener,
            auto_close,
            closed: AtomicBool::new(false),
            close_requests: AtomicUsize::new(0),
        })
    }

    pub fn close_requests(&self) -> usize {
        self.close_requests.load(Ordering::SeqCst)
    }
}

impl Surface for ManualSurface {
    fn close(&self) {
        self.close_requests.fetch_add(1, Ordering::SeqCst);
        if self.auto_close && !self.closed.swap(true, Ordering::SeqCst) {
            self.listener.on_closed();
        }
    }
}

/// Billing SDK whose purchase answer is released by the test.
#[derive(Clone)]
pub struct ManualBilling {
    details: Arc<Mutex<Result<Value>>>,
    pending: Arc<Mutex<Option<oneshot::Sender<PurchaseOutcome>>>>,
    launched: Arc<Notify>,
    launches: Arc<AtomicUsize>,
    fetches: Arc<Mutex<Vec<Vec<String>>>>,
    activity_results: Arc<Mutex<Vec<ActivityResult>>>,
    consumed: Arc<Mutex<Vec<(String, String)>>>,
    setup_failure: Arc<Mutex<Option<String>>>,
    rejects_activity_results: Arc<AtomicBool>,
    hold_details: Arc<AtomicBool>,
    details_released: Arc<Notify>,
    fetching: Arc<Notify>,
}

impl ManualBilling {
    pub fn new(details: Value) -> Self {
        Self {
            details: Arc::new(Mutex::new(Ok(details))),
            pending: Arc::default(),
            launched: Arc::default(),
            launches: Arc::default(),
            fetches: Arc::default(),
            activity_results: Arc::default(),
            consumed: Arc::default(),
            setup_failure: Arc::default(),
            rejects_activity_results: Arc::default(),
            hold_details: Arc::default(),
            details_released: Arc::default(),
            fetching: Arc::default(),
        }
    }

    pub fn failing_details(err: StoreError) -> Self {
        let billing = Self::new(Value::Null);
        *billing.details.lock().unwrap() = Err(err);
        billing
    }

    pub fn fail_setup(&self, reason: &str) {
        *self.setup_failure.lock().unwrap() = Some(reason.to_string());
    }

    /// Makes the SDK refuse every activity result it is handed.
    pub fn reject_activity_results(&self) {
        self.rejects_activity_results.store(true, Ordering::SeqCst);
    }

    /// Keeps product detail queries pending until [`release_details`](Self::release_details).
    pub fn hold_details(&self) {
        self.hold_details.store(true, Ordering::SeqCst);
    }

    pub fn release_details(&self) {
        self.hold_details.store(false, Ordering::SeqCst);
        self.details_released.notify_waiters();
    }

    /// Waits until a product detail query reached the SDK.
    pub async fn wait_fetching(&self) {
        self.fetching.notified().await;
    }

    pub fn as_client(&self) -> BillingClientRef {
        Arc::new(self.clone())
    }

    pub async fn wait_launched(&self) {
        loop {
            if self.pending.lock().unwrap().is_some() {
                return;
            }
            self.launched.notified().await;
        }
    }

    /// Releases the answer of the purchase in progress.
    pub fn complete(&self, outcome: PurchaseOutcome) {
        let sender = self
            .pending
            .lock()
            .unwrap()
            .take()
            .expect("no purchase launched");
        let _ = sender.send(outcome);
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> Vec<Vec<String>> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn activity_results(&self) -> Vec<ActivityResult> {
        self.activity_results.lock().unwrap().clone()
    }

    pub fn consumed(&self) -> Vec<(String, String)> {
        self.consumed.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillingClient for ManualBilling {
    async fn fetch_product_details(&self, skus: &[String]) -> Result<Value> {
        self.fetches.lock().unwrap().push(skus.to_vec());
        self.fetching.notify_one();
        while self.hold_details.load(Ordering::SeqCst) {
            let released = self.details_released.notified();
            if !self.hold_details.load(Ordering::SeqCst) {
                break;
            }
            released.await;
        }
        match &*self.details.lock().unwrap() {
            Ok(value) => Ok(value.clone()),
            Err(e) => Err(StoreError::sdk(e.code(), e.to_string())),
        }
    }

    async fn launch_purchase(
        &self,
        _surface: SurfaceHandle,
        _request_code: i32,
        _sku: &str,
    ) -> Result<Value> {
        let (sender, receiver) = oneshot::channel();
        *self.pending.lock().unwrap() = Some(sender);
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.launched.notify_one();
        receiver
            .await
            .unwrap_or_else(|_| Err(StoreError::Internal("purchase abandoned".to_string())))
    }

    async fn consume_purchase(&self, sku: &str, token: &str) -> Result<()> {
        self.consumed
            .lock()
            .unwrap()
            .push((sku.to_string(), token.to_string()));
        Ok(())
    }

    fn handle_activity_result(&self, result: &ActivityResult) -> bool {
        self.activity_results.lock().unwrap().push(result.clone());
        !self.rejects_activity_results.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BillingConnector for ManualBilling {
    async fn connect(&self) -> std::result::Result<BillingClientRef, String> {
        match self.setup_failure.lock().unwrap().clone() {
            Some(reason) => Err(reason),
            None => Ok(self.as_client()),
        }
    }
}
