use crate::application::store::StoreService;
use crate::config::{BridgeConfig, CallbackMethods};
use crate::domain::ports::{BillingConnectorRef, CallbackSinkRef, UiHostRef};
use crate::domain::product::ProductSpec;
use crate::domain::purchase::{PurchaseRequest, TerminateRequest};
use crate::error::{Result, StoreError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use std::sync::atomic::{AtomicBool, Ordering};

/// JSON entry points called by the scripting layer.
///
/// Every call posts exactly one message to the callback sink, either the
/// result document or `{"error": <code>, "description": <text>}`. Errors
/// never escape to the caller.
pub struct StoreBridge {
    service: StoreService,
    sink: CallbackSinkRef,
    methods: CallbackMethods,
    listing: InFlight,
    terminating: InFlight,
}

impl StoreBridge {
    pub fn new(service: StoreService, sink: CallbackSinkRef, methods: CallbackMethods) -> Self {
        Self {
            service,
            sink,
            methods,
            listing: InFlight::default(),
            terminating: InFlight::default(),
        }
    }

    pub fn from_config(
        config: &BridgeConfig,
        connector: BillingConnectorRef,
        ui_host: UiHostRef,
        sink: CallbackSinkRef,
    ) -> Self {
        let service = StoreService::new(connector, ui_host, config.request_code);
        Self::new(service, sink, config.methods.clone())
    }

    pub fn service(&self) -> &StoreService {
        &self.service
    }

    /// `params_json`: array of `{productId, platformSku}`.
    pub async fn list_products(&self, params_json: &str) {
        let result = match self.listing.enter() {
            Some(_busy) => match decode::<Vec<ProductSpec>>(params_json) {
                Ok(specs) => self.service.list_products(&specs).await,
                Err(e) => Err(e),
            },
            None => Err(StoreError::AlreadyInProgress(
                "Listing products".to_string(),
            )),
        };
        self.reply(&self.methods.list_products, result);
    }

    /// `params_json`: `{productId, platformSku}`.
    pub async fn launch_purchase(&self, params_json: &str) {
        let result = match decode::<PurchaseRequest>(params_json) {
            Ok(request) => self.service.purchase(request).await,
            Err(e) => Err(e),
        };
        self.reply(&self.methods.launch_purchase, result);
    }

    /// `params_json`: `{token, platformSku}`.
    pub async fn terminate_purchase(&self, params_json: &str) {
        let result = match self.terminating.enter() {
            Some(_busy) => match decode::<TerminateRequest>(params_json) {
                Ok(request) => self
                    .service
                    .terminate_purchase(&request)
                    .await
                    .map(|()| Map::new()),
                Err(e) => Err(e),
            },
            None => Err(StoreError::AlreadyInProgress(
                "Terminating purchase".to_string(),
            )),
        };
        self.reply(&self.methods.terminate_purchase, result);
    }

    fn reply<T: Serialize>(&self, method: &str, result: Result<T>) {
        let message = match result.and_then(|value| {
            serde_json::to_string(&value)
                .map_err(|e| StoreError::Internal(format!("Encoding result JSON: {e}")))
        }) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(method, code = %e.code(), error = %e, "operation failed");
                encode_error(&e)
            }
        };
        self.sink.send(method, message);
    }
}

fn decode<T: DeserializeOwned>(params_json: &str) -> Result<T> {
    serde_json::from_str(params_json)
        .inspect_err(|e| tracing::error!(error = %e, "decoding param JSON"))
        .map_err(StoreError::from)
}

fn encode_error(err: &StoreError) -> String {
    serde_json::to_string(&err.to_payload()).unwrap_or_else(|e| {
        tracing::error!(error = %e, "encoding error payload");
        format!("{{\"error\":{}}}", err.code().code())
    })
}

/// Single-flight marker for one entry point.
#[derive(Default)]
struct InFlight(AtomicBool);

struct InFlightGuard<'a>(&'a AtomicBool);

impl InFlight {
    fn enter(&self) -> Option<InFlightGuard<'_>> {
        if self.0.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(InFlightGuard(&self.0))
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_guard_releases_on_drop() {
        let flight = InFlight::default();
        let guard = flight.enter();
        assert!(guard.is_some());
        assert!(flight.enter().is_none());
        drop(guard);
        assert!(flight.enter().is_some());
    }

    #[test]
    fn test_decode_reports_reason() {
        let err = decode::<PurchaseRequest>("{\"productId\": 3}").unwrap_err();
        let payload = serde_json::from_str::<serde_json::Value>(&encode_error(&err)).unwrap();
        assert_eq!(payload["error"], 2004);
        assert!(
            payload["description"]
                .as_str()
                .unwrap()
                .contains("invalid type")
        );
    }
}
