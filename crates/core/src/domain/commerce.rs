use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::domain::lenient;

pub const DEFAULT_COUNTRY: &str = "CO";

/// Store endpoint and REST credentials for one agent. Fixed at startup.
#[derive(Clone, Debug)]
pub struct StoreCredentials {
    pub store_url: String,
    pub consumer_key: SecretString,
    pub consumer_secret: SecretString,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressContact {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub address_1: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    #[serde(deserialize_with = "lenient::u64_value")]
    pub product_id: u64,
    #[serde(deserialize_with = "lenient::u32_value")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "lenient::opt_u64", skip_serializing_if = "Option::is_none")]
    pub variation_id: Option<u64>,
}

/// Order payload as emitted by the model in a `place_order` directive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub billing: AddressContact,
    #[serde(default)]
    pub shipping: AddressContact,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub payment_method_title: String,
    #[serde(default)]
    pub set_paid: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default)]
    pub line_items: Vec<OrderLineItem>,
}

impl OrderRequest {
    pub fn apply_default_country(&mut self, country: &str) {
        for address in [&mut self.billing, &mut self.shipping] {
            if address.country.trim().is_empty() {
                address.country = country.to_string();
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAddress {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub address_1: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub quantity: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub total: Option<String>,
}

/// Order as returned by the store. Any field may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub total: Option<String>,
    #[serde(default)]
    pub payment_method_title: Option<String>,
    #[serde(default)]
    pub billing: OrderAddress,
    #[serde(default)]
    pub shipping: OrderAddress,
    #[serde(default)]
    pub line_items: Vec<OrderLine>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderQuery {
    ById(String),
    ByContact { phone: Option<String>, email: Option<String> },
}

impl OrderQuery {
    /// Builds a query from optional lookup fields; blank values count as absent
    /// and an order id always wins over contact details.
    pub fn from_parts(
        order_id: Option<String>,
        phone: Option<String>,
        email: Option<String>,
    ) -> Option<Self> {
        let order_id = non_blank(order_id);
        let phone = non_blank(phone);
        let email = non_blank(email);

        if let Some(order_id) = order_id {
            return Some(Self::ById(order_id));
        }
        if phone.is_none() && email.is_none() {
            return None;
        }
        Some(Self::ByContact { phone, email })
    }

    /// Free-text search string for contact lookups: phone then email, space separated.
    pub fn search_text(&self) -> Option<String> {
        match self {
            Self::ById(_) => None,
            Self::ByContact { phone, email } => {
                let parts = [phone.as_deref(), email.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>();
                Some(parts.join(" "))
            }
        }
    }

    /// Exact contact match: trimmed billing phone equality, or case-insensitive
    /// billing email equality.
    pub fn matches_contact(&self, order: &OrderRecord) -> bool {
        let Self::ByContact { phone, email } = self else {
            return false;
        };

        let phone_match = phone.as_deref().is_some_and(|phone| {
            order.billing.phone.as_deref().map(str::trim) == Some(phone)
        });
        let email_match = email.as_deref().is_some_and(|email| {
            order
                .billing
                .email
                .as_deref()
                .map(|candidate| candidate.trim().to_lowercase())
                .is_some_and(|candidate| candidate == email.to_lowercase())
        });

        phone_match || email_match
    }
}

/// Store order ids are positive integers; anything else cannot name an order.
pub fn is_order_number(order_id: &str) -> bool {
    !order_id.is_empty() && order_id.bytes().all(|byte| byte.is_ascii_digit())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub price: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default, rename = "type")]
    pub product_type: Option<String>,
}

impl ProductSummary {
    pub fn is_variable(&self) -> bool {
        self.product_type.as_deref() == Some("variable")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationAttribute {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub option: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariation {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: Vec<VariationAttribute>,
}
