use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Platform payload delivered to the transient surface when the purchase
/// dialog returns. Opaque to the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResult {
    pub request_code: i32,
    pub result_code: i32,
    #[serde(default)]
    pub data: Value,
}

/// Handle on a live transient surface.
pub trait Surface: Send + Sync {
    /// Requests the surface to go away. Closing an already closing surface is a no-op.
    fn close(&self);
}

pub type SurfaceHandle = Arc<dyn Surface>;

/// Lifecycle events reported by the UI host for one surface.
///
/// `on_closed` is called exactly once, whatever the cause.
pub trait SurfaceListener: Send + Sync {
    fn on_ready(&self, surface: SurfaceHandle);
    fn on_result(&self, result: ActivityResult);
    fn on_closed(&self);
}

/// Host side facility to show a short-lived screen hosting the store dialog.
pub trait TransientUiHost: Send + Sync {
    fn show(&self, listener: Arc<dyn SurfaceListener>) -> std::result::Result<(), String>;
}

pub type UiHostRef = Arc<dyn TransientUiHost>;

/// The platform billing SDK, once set up.
///
/// Product details and purchase records are the SDK's JSON documents.
#[async_trait]
pub trait BillingClient: Send + Sync {
    async fn fetch_product_details(&self, skus: &[String]) -> Result<Value>;
    async fn launch_purchase(
        &self,
        surface: SurfaceHandle,
        request_code: i32,
        sku: &str,
    ) -> Result<Value>;
    async fn consume_purchase(&self, sku: &str, token: &str) -> Result<()>;
    /// Feeds an activity result to the SDK. Returns whether the SDK recognized it.
    fn handle_activity_result(&self, result: &ActivityResult) -> bool;
}

pub type BillingClientRef = Arc<dyn BillingClient>;

/// Sets up the billing SDK. The error is the SDK's setup diagnostic.
#[async_trait]
pub trait BillingConnector: Send + Sync {
    async fn connect(&self) -> std::result::Result<BillingClientRef, String>;
}

pub type BillingConnectorRef = Arc<dyn BillingConnector>;

/// Delivers completion messages to the scripting layer.
pub trait CallbackSink: Send + Sync {
    fn send(&self, method: &str, message: String);
}

pub type CallbackSinkRef = Arc<dyn CallbackSink>;
