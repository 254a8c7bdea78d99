use std::sync::Arc;

use serde_json::{Map, Value};
use storechat_core::domain::commerce::{is_order_number, OrderQuery, OrderRecord, OrderRequest};
use storechat_core::domain::lenient::value_to_text;
use tracing::{error, info, warn};

use crate::background::OrderWrites;
use crate::commerce::{CommerceClient, CommerceError};
use crate::directive::{ActionDirective, ActionKind};
use crate::render::{self, VariationListing};

/// Product searches only ever render the best match.
const PRODUCT_SEARCH_PAGE_SIZE: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchSettings {
    pub default_country: String,
    pub order_search_page_size: u32,
    pub variation_page_size: u32,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            default_country: storechat_core::domain::commerce::DEFAULT_COUNTRY.to_string(),
            order_search_page_size: 100,
            variation_page_size: 100,
        }
    }
}

/// Runs a parsed directive against one store and renders the reply text.
#[derive(Clone)]
pub struct ActionDispatcher {
    commerce: Arc<dyn CommerceClient>,
    settings: DispatchSettings,
    writes: OrderWrites,
}

impl ActionDispatcher {
    pub fn new(commerce: Arc<dyn CommerceClient>, settings: DispatchSettings) -> Self {
        Self { commerce, settings, writes: OrderWrites::new() }
    }

    /// Registers background order writes on a shared handle.
    pub fn with_writes(mut self, writes: OrderWrites) -> Self {
        self.writes = writes;
        self
    }

    pub async fn dispatch(&self, directive: &ActionDirective, correlation_id: &str) -> String {
        info!(
            event_name = "agent.action.dispatch",
            correlation_id,
            store = self.commerce.store_label(),
            action = directive.kind.as_str(),
            "dispatching model action"
        );

        match &directive.kind {
            ActionKind::PlaceOrder => self.place_order(&directive.parameters, correlation_id),
            ActionKind::GetOrder => self.get_order(&directive.parameters, correlation_id).await,
            ActionKind::SearchProducts => {
                self.search_products(&directive.parameters, correlation_id).await
            }
            ActionKind::Other(name) => {
                warn!(
                    event_name = "agent.action.unknown",
                    correlation_id,
                    action = name.as_str(),
                    "model requested an unknown action"
                );
                render::UNKNOWN_ACTION.to_string()
            }
        }
    }

    /// Confirms immediately; the store write runs on a tracked background task and only logs.
    fn place_order(&self, parameters: &Map<String, Value>, correlation_id: &str) -> String {
        let mut order =
            match serde_json::from_value::<OrderRequest>(Value::Object(parameters.clone())) {
                Ok(order) => order,
                Err(err) => {
                    error!(
                        event_name = "agent.action.invalid_order",
                        correlation_id,
                        error = %err,
                        "place_order parameters do not describe an order"
                    );
                    return render::FALLBACK_TEXT.to_string();
                }
            };
        order.apply_default_country(&self.settings.default_country);

        let commerce = Arc::clone(&self.commerce);
        let mut pending = PendingWrite {
            correlation_id: correlation_id.to_string(),
            store: commerce.store_label().to_string(),
            settled: false,
        };
        self.writes.spawn(async move {
            let correlation_id = pending.correlation_id.clone();
            match commerce.create_order(&order).await {
                Ok(created) => info!(
                    event_name = "agent.order.created",
                    correlation_id = %correlation_id,
                    store = commerce.store_label(),
                    order_id = created.id.as_deref().unwrap_or("unknown"),
                    "order created in background"
                ),
                Err(err) => error!(
                    event_name = "agent.order.create_failed",
                    correlation_id = %correlation_id,
                    store = commerce.store_label(),
                    action = "place_order",
                    error = %err,
                    "background order creation failed"
                ),
            }
            pending.settled = true;
        });

        render::ORDER_PLACED.to_string()
    }

    async fn get_order(&self, parameters: &Map<String, Value>, correlation_id: &str) -> String {
        let query = OrderQuery::from_parts(
            text_param(parameters, "order_id"),
            text_param(parameters, "phone"),
            text_param(parameters, "email"),
        );
        let Some(query) = query else {
            return render::ORDER_NOT_FOUND.to_string();
        };

        match self.find_order(&query, correlation_id).await {
            Ok(Some(order)) => render::render_order(&order),
            Ok(None) => render::ORDER_NOT_FOUND.to_string(),
            Err(err) => {
                error!(
                    event_name = "agent.order.lookup_failed",
                    correlation_id,
                    store = self.commerce.store_label(),
                    error = %err,
                    "order lookup failed"
                );
                render::ORDER_NOT_FOUND.to_string()
            }
        }
    }

    async fn find_order(
        &self,
        query: &OrderQuery,
        correlation_id: &str,
    ) -> Result<Option<OrderRecord>, CommerceError> {
        if let OrderQuery::ById(order_id) = query {
            if !is_order_number(order_id) {
                warn!(
                    event_name = "agent.order.invalid_id",
                    correlation_id,
                    store = self.commerce.store_label(),
                    order_id = order_id.as_str(),
                    "order id is not numeric; skipping lookup"
                );
                return Ok(None);
            }
            return self.commerce.get_order(order_id).await;
        }

        let search = query.search_text().unwrap_or_default();
        let mut candidates =
            self.commerce.search_orders(&search, self.settings.order_search_page_size).await?;

        if let Some(position) = candidates.iter().position(|order| query.matches_contact(order)) {
            return Ok(Some(candidates.swap_remove(position)));
        }
        if candidates.is_empty() {
            return Ok(None);
        }

        warn!(
            event_name = "agent.order.inexact_match",
            correlation_id,
            store = self.commerce.store_label(),
            candidates = candidates.len(),
            "no exact contact match; using first search candidate"
        );
        Ok(Some(candidates.swap_remove(0)))
    }

    async fn search_products(&self, parameters: &Map<String, Value>, correlation_id: &str) -> String {
        let search = text_param(parameters, "query").unwrap_or_default();
        let search = search.trim();
        if search.is_empty() {
            return render::EMPTY_PRODUCT_QUERY.to_string();
        }

        let products = match self
            .commerce
            .search_products(search, PRODUCT_SEARCH_PAGE_SIZE)
            .await
        {
            Ok(products) => products,
            Err(err) => {
                error!(
                    event_name = "agent.product.search_failed",
                    correlation_id,
                    store = self.commerce.store_label(),
                    error = %err,
                    "product search failed"
                );
                return render::PRODUCTS_NOT_FOUND.to_string();
            }
        };
        let Some(product) = products.into_iter().next() else {
            return render::PRODUCTS_NOT_FOUND.to_string();
        };

        let listing = match (product.is_variable(), product.id.as_deref()) {
            (false, _) => VariationListing::NotVariable,
            (true, None) => VariationListing::Unavailable,
            (true, Some(product_id)) => {
                match self
                    .commerce
                    .list_variations(product_id, self.settings.variation_page_size)
                    .await
                {
                    Ok(variations) => VariationListing::Listed(variations),
                    Err(err) => {
                        error!(
                            event_name = "agent.product.variations_failed",
                            correlation_id,
                            store = self.commerce.store_label(),
                            product_id,
                            error = %err,
                            "variation listing failed"
                        );
                        VariationListing::Unavailable
                    }
                }
            }
        };

        render::render_product(&product, &listing)
    }
}

/// Logs an order write that is dropped before it settles, such as when the
/// runtime shuts down with the store call still in flight.
struct PendingWrite {
    correlation_id: String,
    store: String,
    settled: bool,
}

impl Drop for PendingWrite {
    fn drop(&mut self) {
        if !self.settled {
            error!(
                event_name = "agent.order.create_abandoned",
                correlation_id = %self.correlation_id,
                store = %self.store,
                action = "place_order",
                "background order creation abandoned before completion"
            );
        }
    }
}

fn text_param(parameters: &Map<String, Value>, key: &str) -> Option<String> {
    parameters.get(key).and_then(value_to_text)
}
