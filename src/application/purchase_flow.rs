use crate::domain::ports::{
    ActivityResult, BillingClientRef, SurfaceHandle, SurfaceListener, UiHostRef,
};
use crate::domain::product::ProductListing;
use crate::domain::purchase::{PurchaseOutcome, PurchaseRequest, PurchasedProduct};
use crate::error::{Result, StoreError};
use std::slice;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    AwaitingUiReady,
    AwaitingPurchaseResult,
    Closing,
    Done,
}

/// The live record of the purchase in progress.
#[derive(Debug)]
pub struct PendingFlow {
    request: PurchaseRequest,
    state: FlowState,
    ui_closed: bool,
    result_delivered: bool,
    activity_result_seen: bool,
    sdk_result: Option<PurchaseOutcome>,
}

/// Read-only view of the pending flow.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSnapshot {
    pub request: PurchaseRequest,
    pub state: FlowState,
    pub ui_closed: bool,
    pub result_delivered: bool,
    pub activity_result_seen: bool,
    pub has_sdk_result: bool,
}

impl PendingFlow {
    fn new(request: PurchaseRequest) -> Self {
        Self {
            request,
            state: FlowState::Idle,
            ui_closed: false,
            result_delivered: false,
            activity_result_seen: false,
            sdk_result: None,
        }
    }

    fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            request: self.request.clone(),
            state: self.state,
            ui_closed: self.ui_closed,
            result_delivered: self.result_delivered,
            activity_result_seen: self.activity_result_seen,
            has_sdk_result: self.sdk_result.is_some(),
        }
    }

    fn surface_requested(&mut self) {
        if self.state == FlowState::Idle {
            self.state = FlowState::AwaitingUiReady;
        }
    }

    /// Returns whether the purchase should be launched on the surface.
    fn ui_ready(&mut self) -> bool {
        if self.state != FlowState::AwaitingUiReady || self.ui_closed {
            return false;
        }
        self.state = FlowState::AwaitingPurchaseResult;
        true
    }

    fn activity_result(&mut self) {
        self.activity_result_seen = true;
    }

    /// Attaches the SDK outcome. Only the first one counts.
    fn sdk_completed(&mut self, outcome: PurchaseOutcome) -> bool {
        if self.result_delivered || self.sdk_result.is_some() {
            return false;
        }
        self.sdk_result = Some(outcome);
        if !self.ui_closed {
            self.state = FlowState::Closing;
        }
        true
    }

    fn ui_closed(&mut self) {
        self.ui_closed = true;
    }

    /// Takes the outcome to deliver, if the flow can complete now.
    ///
    /// A flow completes once the surface is gone. Without an SDK outcome the
    /// purchase counts as canceled, unless the dialog already handed its
    /// result to the SDK, in which case the SDK answer is still coming.
    fn settle(&mut self) -> Option<PurchaseOutcome> {
        if self.result_delivered || !self.ui_closed {
            return None;
        }
        let outcome = match self.sdk_result.take() {
            Some(outcome) => outcome,
            None if self.activity_result_seen && self.state == FlowState::AwaitingPurchaseResult => {
                return None;
            }
            None => Err(StoreError::Canceled("Dialog closed".to_string())),
        };
        self.result_delivered = true;
        self.state = FlowState::Done;
        Some(outcome)
    }

    /// Completes a flow whose event sources are all gone.
    fn abandon(&mut self) -> PurchaseOutcome {
        self.ui_closed = true;
        self.settle().unwrap_or_else(|| {
            self.result_delivered = true;
            self.state = FlowState::Done;
            Err(StoreError::Internal(
                "Purchase flow ended without a result".to_string(),
            ))
        })
    }
}

enum FlowEvent {
    Ready(SurfaceHandle),
    ActivityResult(ActivityResult),
    SdkResult(PurchaseOutcome),
    Closed,
}

/// Forwards the UI host's callbacks into the flow's event queue.
struct FlowListener {
    events: UnboundedSender<FlowEvent>,
}

impl FlowListener {
    fn post(&self, event: FlowEvent, name: &str) {
        if self.events.send(event).is_err() {
            tracing::debug!(event = name, "purchase flow already settled, ignoring UI event");
        }
    }
}

impl SurfaceListener for FlowListener {
    fn on_ready(&self, surface: SurfaceHandle) {
        self.post(FlowEvent::Ready(surface), "ready");
    }

    fn on_result(&self, result: ActivityResult) {
        self.post(FlowEvent::ActivityResult(result), "result");
    }

    fn on_closed(&self) {
        self.post(FlowEvent::Closed, "closed");
    }
}

/// Clears the pending slot when the flow ends, including when the caller
/// drops the `launch` future.
struct FlowSlot<'a> {
    slot: &'a Mutex<Option<PendingFlow>>,
}

impl Drop for FlowSlot<'_> {
    fn drop(&mut self) {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Drives one UI-mediated purchase at a time.
///
/// The UI host's lifecycle events and the billing SDK's answer may arrive in
/// any order and on any thread; they are funneled through a single queue and
/// the caller gets exactly one result back from [`launch`](Self::launch).
pub struct PurchaseFlowCoordinator {
    ui_host: UiHostRef,
    request_code: i32,
    slot: Mutex<Option<PendingFlow>>,
}

impl PurchaseFlowCoordinator {
    pub fn new(ui_host: UiHostRef, request_code: i32) -> Self {
        Self {
            ui_host,
            request_code,
            slot: Mutex::new(None),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.lock().is_some()
    }

    pub fn snapshot(&self) -> Option<FlowSnapshot> {
        self.lock().as_ref().map(PendingFlow::snapshot)
    }

    /// Runs a purchase: fetches the product details, shows the surface,
    /// launches the SDK purchase on it and waits for the flow to settle.
    pub async fn launch(
        &self,
        request: PurchaseRequest,
        billing: BillingClientRef,
    ) -> Result<PurchasedProduct> {
        let _slot = self.begin(&request)?;

        let answer = billing
            .fetch_product_details(slice::from_ref(&request.platform_sku))
            .await?;
        let details = ProductListing::from_sdk(answer)?.into_single(&request.platform_sku)?;

        let outcome = self.drive(&request, billing).await?;
        match outcome {
            Ok(record) => {
                let product = PurchasedProduct::shape(&request, &details, record).inspect_err(
                    |e| tracing::error!(sku = %request.platform_sku, error = %e, "failed to shape purchase record"),
                )?;
                tracing::info!(sku = %product.platform_sku, product = %product.product_id, "purchase completed");
                Ok(product)
            }
            Err(e) => {
                tracing::info!(sku = %request.platform_sku, code = %e.code(), error = %e, "purchase did not complete");
                Err(e)
            }
        }
    }

    fn begin(&self, request: &PurchaseRequest) -> Result<FlowSlot<'_>> {
        let mut slot = self.lock();
        if let Some(pending) = slot.as_ref() {
            tracing::warn!(
                pending = %pending.request.platform_sku,
                requested = %request.platform_sku,
                "purchase already in progress"
            );
            return Err(StoreError::AlreadyInProgress(
                "Launching purchase".to_string(),
            ));
        }
        *slot = Some(PendingFlow::new(request.clone()));
        Ok(FlowSlot { slot: &self.slot })
    }

    async fn drive(
        &self,
        request: &PurchaseRequest,
        billing: BillingClientRef,
    ) -> Result<PurchaseOutcome> {
        let (events, mut inbox) = mpsc::unbounded_channel();
        let launcher = events.downgrade();

        self.with_flow(PendingFlow::surface_requested);
        self.ui_host
            .show(Arc::new(FlowListener { events }))
            .map_err(|e| StoreError::Internal(format!("Opening purchase surface: {e}")))?;

        let mut surface: Option<SurfaceHandle> = None;
        loop {
            // Ends only if the host drops the listener before any surface holds it
            let Some(event) = inbox.recv().await else {
                tracing::warn!(sku = %request.platform_sku, "purchase surface vanished without closing");
                return self
                    .with_flow(PendingFlow::abandon)
                    .ok_or_else(Self::lost_flow);
            };

            match event {
                FlowEvent::Ready(handle) => {
                    if self.with_flow(PendingFlow::ui_ready).unwrap_or(false) {
                        tracing::debug!(sku = %request.platform_sku, "surface ready, launching purchase");
                        if let Some(events) = launcher.upgrade() {
                            self.spawn_purchase(
                                Arc::clone(&billing),
                                Arc::clone(&handle),
                                request.platform_sku.clone(),
                                events,
                            );
                        }
                        surface = Some(handle);
                    }
                }
                FlowEvent::ActivityResult(result) => {
                    let recognized = billing.handle_activity_result(&result);
                    // Only a result the SDK took in means its answer is still coming
                    if recognized && result.request_code == self.request_code {
                        self.with_flow(PendingFlow::activity_result);
                    }
                    tracing::debug!(
                        request_code = result.request_code,
                        result_code = result.result_code,
                        recognized,
                        "forwarded activity result"
                    );
                }
                FlowEvent::SdkResult(outcome) => {
                    if self
                        .with_flow(|flow| flow.sdk_completed(outcome))
                        .unwrap_or(false)
                        && let Some(surface) = &surface
                    {
                        surface.close();
                    }
                }
                FlowEvent::Closed => {
                    self.with_flow(PendingFlow::ui_closed);
                }
            }

            if let Some(outcome) = self.with_flow(PendingFlow::settle).flatten() {
                return Ok(outcome);
            }
        }
    }

    fn spawn_purchase(
        &self,
        billing: BillingClientRef,
        surface: SurfaceHandle,
        sku: String,
        events: UnboundedSender<FlowEvent>,
    ) {
        let request_code = self.request_code;
        tokio::spawn(async move {
            let outcome = billing.launch_purchase(surface, request_code, &sku).await;
            if events.send(FlowEvent::SdkResult(outcome)).is_err() {
                tracing::debug!(%sku, "purchase flow already settled, ignoring SDK result");
            }
        });
    }

    fn with_flow<T>(&self, f: impl FnOnce(&mut PendingFlow) -> T) -> Option<T> {
        self.lock().as_mut().map(f)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<PendingFlow>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lost_flow() -> StoreError {
        StoreError::Internal("Pending purchase flow disappeared".to_string())
    }
}
