use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use storechat_core::domain::commerce::{
    OrderRecord, OrderRequest, ProductSummary, ProductVariation,
};
use tokio::sync::Notify;

use crate::commerce::{CommerceClient, CommerceError};
use crate::llm::{ChatRequest, LlmClient, LlmError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommerceCall {
    CreateOrder,
    GetOrder(String),
    SearchOrders(String, u32),
    SearchProducts(String, u32),
    ListVariations(String, u32),
}

#[derive(Default)]
pub struct FakeCommerce {
    orders: Vec<OrderRecord>,
    search_results: Vec<OrderRecord>,
    products: Vec<ProductSummary>,
    variations: Vec<ProductVariation>,
    fail_reads: bool,
    fail_variations: bool,
    write_gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<CommerceCall>>,
    created: Mutex<Vec<OrderRequest>>,
}

impl FakeCommerce {
    pub fn with_order(mut self, order: OrderRecord) -> Self {
        self.orders.push(order);
        self
    }

    pub fn with_search_orders(mut self, orders: Vec<OrderRecord>) -> Self {
        self.search_results = orders;
        self
    }

    pub fn with_products(mut self, products: Vec<ProductSummary>) -> Self {
        self.products = products;
        self
    }

    pub fn with_variations(mut self, variations: Vec<ProductVariation>) -> Self {
        self.variations = variations;
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Only variation listings fail; product searches still succeed.
    pub fn failing_variations(mut self) -> Self {
        self.fail_variations = true;
        self
    }

    /// Order writes wait on `gate` before completing.
    pub fn with_write_gate(mut self, gate: Arc<Notify>) -> Self {
        self.write_gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<CommerceCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn created(&self) -> Vec<OrderRequest> {
        self.created.lock().map(|created| created.clone()).unwrap_or_default()
    }

    fn record(&self, call: CommerceCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn read_guard(&self) -> Result<(), CommerceError> {
        if self.fail_reads {
            return Err(CommerceError::Status { status: 500, body: "boom".to_string() });
        }
        Ok(())
    }
}

#[async_trait]
impl CommerceClient for FakeCommerce {
    fn store_label(&self) -> &str {
        "fake-store"
    }

    async fn create_order(&self, order: &OrderRequest) -> Result<OrderRecord, CommerceError> {
        self.record(CommerceCall::CreateOrder);
        if let Some(gate) = &self.write_gate {
            gate.notified().await;
        }
        if let Ok(mut created) = self.created.lock() {
            created.push(order.clone());
        }
        Ok(OrderRecord { id: Some("1001".to_string()), ..OrderRecord::default() })
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>, CommerceError> {
        self.record(CommerceCall::GetOrder(order_id.to_string()));
        self.read_guard()?;
        Ok(self.orders.iter().find(|order| order.id.as_deref() == Some(order_id)).cloned())
    }

    async fn search_orders(
        &self,
        search: &str,
        per_page: u32,
    ) -> Result<Vec<OrderRecord>, CommerceError> {
        self.record(CommerceCall::SearchOrders(search.to_string(), per_page));
        self.read_guard()?;
        Ok(self.search_results.clone())
    }

    async fn search_products(
        &self,
        search: &str,
        per_page: u32,
    ) -> Result<Vec<ProductSummary>, CommerceError> {
        self.record(CommerceCall::SearchProducts(search.to_string(), per_page));
        self.read_guard()?;
        Ok(self.products.clone())
    }

    async fn list_variations(
        &self,
        product_id: &str,
        per_page: u32,
    ) -> Result<Vec<ProductVariation>, CommerceError> {
        self.record(CommerceCall::ListVariations(product_id.to_string(), per_page));
        self.read_guard()?;
        if self.fail_variations {
            return Err(CommerceError::Transport("variations timed out".to_string()));
        }
        Ok(self.variations.clone())
    }
}

/// Replays scripted replies in order; `None` entries fail the call.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Option<String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn replying(replies: impl IntoIterator<Item = Option<&'static str>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|reply| reply.map(str::to_string)).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let next = self.replies.lock().ok().and_then(|mut replies| replies.pop_front()).flatten();
        next.ok_or_else(|| LlmError::Transport("scripted failure".to_string()))
    }
}
