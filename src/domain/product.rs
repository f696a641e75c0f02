use crate::error::{Result, StoreError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A product as configured on the caller's side, together with the SKU the
/// platform store knows it under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSpec {
    pub product_id: String,
    #[serde(alias = "googlePlayId", alias = "internalProductId")]
    pub platform_sku: String,
}

/// One entry of the store's product details answer.
///
/// Fields the store returns beyond the ones we read are kept in `extra` and
/// written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    /// SKU on the platform store.
    pub internal_product_id: String,
    /// Caller's product id, filled in by [`ProductListing::enrich`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub currency: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductListing {
    pub products: Vec<ProductDetails>,
}

impl ProductListing {
    /// Decodes the raw answer of the billing SDK.
    pub fn from_sdk(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| StoreError::Internal(format!("Decoding product JSON: {e}")))
    }

    /// Puts back the caller's product ids, matched by SKU.
    ///
    /// Entries without a matching spec are kept as they are.
    pub fn enrich(&mut self, specs: &[ProductSpec]) {
        for product in &mut self.products {
            if let Some(spec) = specs
                .iter()
                .rfind(|spec| spec.platform_sku == product.internal_product_id)
            {
                product.product_id = Some(spec.product_id.clone());
            }
        }
    }

    /// Details for a single SKU, as needed before launching a purchase.
    pub fn into_single(self, sku: &str) -> Result<ProductDetails> {
        self.products
            .into_iter()
            .find(|product| product.internal_product_id == sku)
            .ok_or_else(|| {
                StoreError::Internal(format!("Decoding product JSON: no details returned for {sku}"))
            })
    }
}
