use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use storechat_agent::commerce::{CommerceClient, CommerceError};
use storechat_agent::dispatch::{ActionDispatcher, DispatchSettings};
use storechat_agent::llm::{ChatRequest, LlmClient, LlmError};
use storechat_agent::render;
use storechat_agent::runtime::{AgentRuntime, TurnSettings};
use storechat_agent::session::SessionManager;
use storechat_agent::WebhookRequest;
use storechat_core::domain::commerce::{
    OrderRecord, OrderRequest, ProductSummary, ProductVariation,
};
use tokio::sync::{mpsc, Notify};

struct FixedLlm {
    reply: String,
}

#[async_trait]
impl LlmClient for FixedLlm {
    async fn complete(&self, _request: ChatRequest) -> Result<String, LlmError> {
        Ok(self.reply.clone())
    }
}

/// Store whose order writes block until released and report completion on a channel.
struct GatedStore {
    release: Arc<Notify>,
    written: mpsc::UnboundedSender<OrderRequest>,
    reads: Mutex<Vec<String>>,
}

#[async_trait]
impl CommerceClient for GatedStore {
    fn store_label(&self) -> &str {
        "gated"
    }

    async fn create_order(&self, order: &OrderRequest) -> Result<OrderRecord, CommerceError> {
        self.release.notified().await;
        let _ = self.written.send(order.clone());
        Ok(OrderRecord::default())
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>, CommerceError> {
        if let Ok(mut reads) = self.reads.lock() {
            reads.push(format!("get:{order_id}"));
        }
        Ok(None)
    }

    async fn search_orders(&self, search: &str, _per_page: u32) -> Result<Vec<OrderRecord>, CommerceError> {
        if let Ok(mut reads) = self.reads.lock() {
            reads.push(format!("search:{search}"));
        }
        Ok(Vec::new())
    }

    async fn search_products(
        &self,
        _search: &str,
        _per_page: u32,
    ) -> Result<Vec<ProductSummary>, CommerceError> {
        Ok(Vec::new())
    }

    async fn list_variations(
        &self,
        _product_id: &str,
        _per_page: u32,
    ) -> Result<Vec<ProductVariation>, CommerceError> {
        Ok(Vec::new())
    }
}

fn gated_store() -> (Arc<GatedStore>, Arc<Notify>, mpsc::UnboundedReceiver<OrderRequest>) {
    let release = Arc::new(Notify::new());
    let (written, receiver) = mpsc::unbounded_channel();
    let store =
        Arc::new(GatedStore { release: release.clone(), written, reads: Mutex::new(Vec::new()) });
    (store, release, receiver)
}

fn agent(reply: &str, store: Arc<GatedStore>) -> AgentRuntime {
    AgentRuntime::new(
        "relojeria",
        "Eres el asistente de la relojería.",
        Arc::new(FixedLlm { reply: reply.to_string() }),
        ActionDispatcher::new(store, DispatchSettings::default()),
        SessionManager::new(50, 20, "conversation_history"),
        TurnSettings::default(),
    )
}

fn webhook(query: &str, history: Value) -> WebhookRequest {
    serde_json::from_value(json!({
        "session": "projects/relojeria/agent/sessions/abc-123",
        "queryResult": {
            "queryText": query,
            "outputContexts": [{
                "name": "projects/relojeria/agent/sessions/abc-123/contexts/conversation_history",
                "lifespanCount": 19,
                "parameters": {"history": history}
            }]
        }
    }))
    .expect("webhook request")
}

#[tokio::test]
async fn plain_reply_passes_through_and_history_round_trips() {
    let (store, _release, _written) = gated_store();
    let runtime = agent("Tenemos el Submariner disponible.", store.clone());
    let prior = json!([
        {"role": "user", "content": "hola"},
        {"role": "assistant", "content": "¡Hola! ¿Qué reloj buscas?"}
    ]);

    let response = runtime.handle_webhook(webhook("¿tienen Submariner?", prior), "it").await.expect("response");

    assert_eq!(response.fulfillment_text, "Tenemos el Submariner disponible.");
    let context = &response.output_contexts[0];
    assert_eq!(
        context.name,
        "projects/relojeria/agent/sessions/abc-123/contexts/conversation_history"
    );
    assert_eq!(context.lifespan_count, Some(20));
    assert_eq!(
        context.parameters["history"],
        json!([
            {"role": "user", "content": "hola"},
            {"role": "assistant", "content": "¡Hola! ¿Qué reloj buscas?"},
            {"role": "user", "content": "¿tienen Submariner?"},
            {"role": "assistant", "content": "Tenemos el Submariner disponible."}
        ])
    );
    assert!(store.reads.lock().map(|reads| reads.is_empty()).unwrap_or(false));
}

#[tokio::test]
async fn place_order_confirms_before_the_write_settles() {
    let (store, release, mut written) = gated_store();
    let reply = r#"Listo, registro tu pedido.
[ACTION](place_order) {
  "billing": {"first_name": "Juan", "last_name": "Pérez", "address_1": "Calle 123",
              "city": "Bogotá", "state": "CUN", "phone": "3001234567"},
  "shipping": {"first_name": "Juan", "last_name": "Pérez", "address_1": "Calle 123",
               "city": "Bogotá", "state": "CUN"},
  "payment_method": "cod",
  "payment_method_title": "Pago contra Entrega",
  "set_paid": false,
  "status": "processing",
  "line_items": [{"product_id": "15953", "quantity": "1", "variation_id": "16001"}]
}"#;
    let runtime = agent(reply, store);

    let response = runtime.handle_webhook(webhook("sí, confirmo", json!([])), "it").await.expect("response");

    assert_eq!(response.fulfillment_text, render::ORDER_PLACED);
    assert!(written.try_recv().is_err());
    let history = response.output_contexts[0].parameters["history"].as_array().cloned().unwrap_or_default();
    assert_eq!(history.len(), 3);
    assert_eq!(history[2]["content"], json!(render::ORDER_PLACED));

    release.notify_one();
    let order = tokio::time::timeout(Duration::from_secs(5), written.recv())
        .await
        .expect("background write finished")
        .expect("order sent");
    assert_eq!(order.billing.country, "CO");
    assert_eq!(order.shipping.country, "CO");
    assert_eq!(order.line_items[0].product_id, 15953);
    assert_eq!(order.line_items[0].variation_id, Some(16001));
}

#[tokio::test]
async fn order_id_lookup_goes_straight_to_the_order() {
    let (store, _release, _written) = gated_store();
    let runtime = agent(r#"Déjame revisar. [ACTION](get_order) {"order_id": "456"}"#, store.clone());

    let response = runtime.handle_webhook(webhook("mi pedido es 456", json!([])), "it").await.expect("response");

    assert_eq!(response.fulfillment_text, render::ORDER_NOT_FOUND);
    let reads = store.reads.lock().map(|reads| reads.clone()).unwrap_or_default();
    assert_eq!(reads, vec!["get:456".to_string()]);
}
