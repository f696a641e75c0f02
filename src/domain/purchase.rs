use super::product::ProductDetails;
use crate::error::{Result, StoreError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_STORE: &str = "googleplay";

/// A purchase as asked for by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub product_id: String,
    #[serde(alias = "googlePlayId", alias = "internalProductId")]
    pub platform_sku: String,
}

/// Consumption of a completed purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateRequest {
    pub token: String,
    #[serde(alias = "internalProductId")]
    pub platform_sku: String,
}

/// Raw result of the billing SDK purchase call: the JSON purchase record on
/// success, the SDK's own failure otherwise.
pub type PurchaseOutcome = Result<Value>;

/// Shape of the purchase record returned by the billing SDK.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SdkPurchase {
    #[serde(default)]
    store: Option<String>,
    #[serde(default, alias = "internalProductId")]
    platform_sku: Option<String>,
    token: String,
    #[serde(default)]
    receipt: Option<String>,
}

/// Completed purchase, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasedProduct {
    pub store: String,
    pub product_id: String,
    pub platform_sku: String,
    /// Consumption token, needed to terminate the purchase.
    pub token: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
}

impl PurchasedProduct {
    /// Builds the caller-facing result from the SDK purchase record.
    ///
    /// The SDK does not know the caller's product id, nor the price paid; both
    /// come from the request and the details fetched before the purchase.
    pub fn shape(
        request: &PurchaseRequest,
        details: &ProductDetails,
        sdk_result: Value,
    ) -> Result<Self> {
        let purchase: SdkPurchase = serde_json::from_value(sdk_result)
            .map_err(|e| StoreError::Internal(format!("Adding info to receipt JSON: {e}")))?;

        Ok(Self {
            store: purchase.store.unwrap_or_else(|| DEFAULT_STORE.to_string()),
            product_id: request.product_id.clone(),
            platform_sku: purchase
                .platform_sku
                .unwrap_or_else(|| request.platform_sku.clone()),
            token: purchase.token,
            price: details.price,
            currency: details.currency.clone(),
            receipt: purchase.receipt,
        })
    }
}
