use async_trait::async_trait;
use storechat_core::domain::commerce::{
    OrderRecord, OrderRequest, ProductSummary, ProductVariation,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommerceError {
    #[error("store request failed: {0}")]
    Transport(String),
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("store response could not be decoded: {0}")]
    Decode(String),
}

/// One store's REST surface. Implementations carry their own credentials.
#[async_trait]
pub trait CommerceClient: Send + Sync {
    /// Human-readable store identifier for logs.
    fn store_label(&self) -> &str;

    async fn create_order(&self, order: &OrderRequest) -> Result<OrderRecord, CommerceError>;

    /// `Ok(None)` when the store has no order with this id.
    async fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>, CommerceError>;

    async fn search_orders(
        &self,
        search: &str,
        per_page: u32,
    ) -> Result<Vec<OrderRecord>, CommerceError>;

    async fn search_products(
        &self,
        search: &str,
        per_page: u32,
    ) -> Result<Vec<ProductSummary>, CommerceError>;

    async fn list_variations(
        &self,
        product_id: &str,
        per_page: u32,
    ) -> Result<Vec<ProductVariation>, CommerceError>;
}
