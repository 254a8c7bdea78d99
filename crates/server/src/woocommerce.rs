use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use storechat_agent::commerce::{CommerceClient, CommerceError};
use storechat_core::domain::commerce::{
    OrderRecord, OrderRequest, ProductSummary, ProductVariation, StoreCredentials,
};
use tracing::debug;

/// WooCommerce REST v3 client bound to one store.
pub struct WooCommerceClient {
    client: Client,
    api_base: String,
    label: String,
    consumer_key: SecretString,
    consumer_secret: SecretString,
}

impl WooCommerceClient {
    pub fn new(
        label: impl Into<String>,
        credentials: &StoreCredentials,
        timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(timeout_secs)).build()?;
        Ok(Self {
            client,
            api_base: format!("{}/wp-json/wc/v3", credentials.store_url.trim_end_matches('/')),
            label: label.into(),
            consumer_key: credentials.consumer_key.clone(),
            consumer_secret: credentials.consumer_secret.clone(),
        })
    }

    /// Endpoint under the API base. Each segment is percent-encoded, so ids
    /// cannot escape their path position.
    fn url(&self, segments: &[&str]) -> Result<Url, CommerceError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|error| CommerceError::Transport(format!("invalid store url: {error}")))?;
        url.path_segments_mut()
            .map_err(|()| CommerceError::Transport(format!("store url `{}` has no path", self.api_base)))?
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(
            self.consumer_key.expose_secret(),
            Some(self.consumer_secret.expose_secret()),
        )
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, CommerceError> {
        self.authorized(builder)
            .send()
            .await
            .map_err(|error| CommerceError::Transport(error.to_string()))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, CommerceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CommerceError::Status { status: status.as_u16(), body });
        }
        response.json::<T>().await.map_err(|error| CommerceError::Decode(error.to_string()))
    }
}

#[async_trait]
impl CommerceClient for WooCommerceClient {
    fn store_label(&self) -> &str {
        &self.label
    }

    async fn create_order(&self, order: &OrderRequest) -> Result<OrderRecord, CommerceError> {
        debug!(store = %self.label, "creating order");
        let response = self.send(self.client.post(self.url(&["orders"])?).json(order)).await?;
        Self::decode(response).await
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>, CommerceError> {
        let response = self.send(self.client.get(self.url(&["orders", order_id])?)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }

    async fn search_orders(
        &self,
        search: &str,
        per_page: u32,
    ) -> Result<Vec<OrderRecord>, CommerceError> {
        let per_page = per_page.to_string();
        let request = self
            .client
            .get(self.url(&["orders"])?)
            .query(&[("search", search), ("per_page", per_page.as_str())]);
        Self::decode(self.send(request).await?).await
    }

    async fn search_products(
        &self,
        search: &str,
        per_page: u32,
    ) -> Result<Vec<ProductSummary>, CommerceError> {
        let per_page = per_page.to_string();
        let request = self
            .client
            .get(self.url(&["products"])?)
            .query(&[("search", search), ("per_page", per_page.as_str())]);
        Self::decode(self.send(request).await?).await
    }

    async fn list_variations(
        &self,
        product_id: &str,
        per_page: u32,
    ) -> Result<Vec<ProductVariation>, CommerceError> {
        let request = self
            .client
            .get(self.url(&["products", product_id, "variations"])?)
            .query(&[("per_page", per_page)]);
        Self::decode(self.send(request).await?).await
    }
}
