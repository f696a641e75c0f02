use super::purchase_flow::PurchaseFlowCoordinator;
use crate::domain::ports::{BillingClientRef, BillingConnectorRef, UiHostRef};
use crate::domain::product::{ProductListing, ProductSpec};
use crate::domain::purchase::{PurchaseRequest, PurchasedProduct, TerminateRequest};
use crate::error::{Result, StoreError};

/// Typed store operations on top of the billing SDK.
///
/// Each operation sets up the SDK on demand, as the platform requires a
/// fresh handle per call.
pub struct StoreService {
    connector: BillingConnectorRef,
    purchases: PurchaseFlowCoordinator,
}

impl StoreService {
    /// Creates a new `StoreService`.
    ///
    /// # Arguments
    ///
    /// * `connector` - Sets up the billing SDK.
    /// * `ui_host` - Shows the transient surface hosting the purchase dialog.
    /// * `request_code` - Request code the purchase dialog reports back with.
    pub fn new(connector: BillingConnectorRef, ui_host: UiHostRef, request_code: i32) -> Self {
        Self {
            connector,
            purchases: PurchaseFlowCoordinator::new(ui_host, request_code),
        }
    }

    pub fn purchases(&self) -> &PurchaseFlowCoordinator {
        &self.purchases
    }

    /// Lists the products on sale, with the caller's product ids put back.
    pub async fn list_products(&self, specs: &[ProductSpec]) -> Result<ProductListing> {
        let skus: Vec<String> = specs.iter().map(|spec| spec.platform_sku.clone()).collect();
        let billing = self.connect().await?;

        let answer = billing.fetch_product_details(&skus).await?;
        let mut listing = ProductListing::from_sdk(answer)?;
        listing.enrich(specs);

        tracing::debug!(
            requested = specs.len(),
            returned = listing.products.len(),
            "listed products"
        );
        Ok(listing)
    }

    /// Runs the purchase flow for one product.
    pub async fn purchase(&self, request: PurchaseRequest) -> Result<PurchasedProduct> {
        // Refuse before touching the SDK; the coordinator checks again atomically.
        if self.purchases.is_busy() {
            return Err(StoreError::AlreadyInProgress(
                "Launching purchase".to_string(),
            ));
        }
        let billing = self.connect().await?;
        self.purchases.launch(request, billing).await
    }

    /// Consumes a purchase so that the product can be bought again.
    pub async fn terminate_purchase(&self, request: &TerminateRequest) -> Result<()> {
        let billing = self.connect().await?;
        billing
            .consume_purchase(&request.platform_sku, &request.token)
            .await?;
        tracing::info!(sku = %request.platform_sku, "purchase consumed");
        Ok(())
    }

    async fn connect(&self) -> Result<BillingClientRef> {
        self.connector.connect().await.map_err(|reason| {
            tracing::warn!(%reason, "billing setup failed");
            StoreError::ExternalStore(reason)
        })
    }
}
