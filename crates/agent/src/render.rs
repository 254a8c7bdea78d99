use std::fmt::Write as _;

use storechat_core::domain::commerce::{OrderRecord, ProductSummary, ProductVariation};

const MISSING: &str = "N/A";

pub const FALLBACK_TEXT: &str = "Hubo un error procesando tu solicitud.";
pub const ORDER_PLACED: &str = "Acabo de enviar tu pedido a la trasportadora para que sea procesado. Te llegara un WhatsApp que debes confirmar, para que despachen tu pedido.";
pub const ORDER_NOT_FOUND: &str = "No se encontró un pedido con esa información. Por favor, verifica los datos y vuelve a intentarlo. 😊";
pub const EMPTY_PRODUCT_QUERY: &str =
    "Por favor, proporciona un término de búsqueda para encontrar productos.";
pub const PRODUCTS_NOT_FOUND: &str = "No se encontraron productos que coincidan con tu búsqueda. Por favor, intenta con otro término. 😊";
pub const UNKNOWN_ACTION: &str = "Acción no reconocida.";

pub(crate) const VARIATIONS_UNAVAILABLE: &str =
    "🔄 **Variaciones Disponibles:** No se pudieron obtener las variaciones en este momento.\n\n";
pub(crate) const PRODUCT_FOOTER: &str =
    "Puedes realizar tu pedido en el enlace o yo puedo ayudarte por este medio.\nEstoy aquí para ayudarte 😊";

/// Customer-facing wording for store order status codes. Unknown codes pass through.
pub fn translate_status(status: &str) -> &str {
    match status {
        "on-hold" => "En espera de confirmación",
        "processing" => "Pedido enviado a la transportadora",
        "completed" => "Pedido entregado",
        "cancelled" => "Pedido cancelado",
        "refunded" => "Pedido reembolsado",
        other => other,
    }
}

fn or_missing(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(MISSING)
}

pub fn render_order(order: &OrderRecord) -> String {
    let status = order.status.as_deref().map(translate_status).unwrap_or(MISSING);
    let billing = &order.billing;
    let shipping = &order.shipping;

    let mut text = String::from("🎉 ¡Pedido encontrado! 🎉\n\n");
    let _ = writeln!(text, "🔹 **Número de pedido**: {}", or_missing(&order.id));
    let _ = writeln!(
        text,
        "👤 **Cliente**: {} {}",
        or_missing(&billing.first_name),
        or_missing(&billing.last_name)
    );
    let _ = writeln!(text, "🛠️ **Estado**: '{status}'");
    let _ = writeln!(text, "💲 **Total**: {}", or_missing(&order.total));
    let _ = writeln!(text, "💳 **Método de pago**: {}", or_missing(&order.payment_method_title));
    let _ = writeln!(
        text,
        "📍 **Dirección de envío**: {}, {}, {}\n",
        or_missing(&shipping.address_1),
        or_missing(&shipping.city),
        or_missing(&shipping.state)
    );
    text.push_str("🛒 **Artículos del pedido**:\n");
    for item in &order.line_items {
        let _ = writeln!(
            text,
            "   - {}: {} x {}",
            item.name.as_deref().unwrap_or("Producto sin nombre"),
            item.quantity.unwrap_or(1),
            or_missing(&item.total)
        );
    }
    text.push_str("\nGracias por tu compra. ¡Esperamos que disfrutes de nuestros productos! 😄");
    text
}

/// What is known about a product's variations at render time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VariationListing {
    NotVariable,
    Listed(Vec<ProductVariation>),
    Unavailable,
}

pub fn render_product(product: &ProductSummary, variations: &VariationListing) -> String {
    let mut text = String::from("🔍 **Resultado de la búsqueda:**\n\n");
    let _ = writeln!(
        text,
        "**{} (ID: {})**",
        product.name.as_deref().unwrap_or("Nombre no disponible"),
        or_missing(&product.id)
    );
    let _ = writeln!(text, "💲 Precio: {} {}", or_missing(&product.price), or_missing(&product.currency));
    let _ = writeln!(text, "🔗 [Ver Producto]({})\n", product.permalink.as_deref().unwrap_or("#"));

    match variations {
        VariationListing::NotVariable => {}
        VariationListing::Unavailable => text.push_str(VARIATIONS_UNAVAILABLE),
        VariationListing::Listed(listed) => {
            if let Some(first) = listed.first() {
                text.push_str("🔄 **Variaciones Disponibles:**\n");
                text.push_str(&attribute_header(first));
                text.push('\n');
                for variation in listed {
                    let options = variation
                        .attributes
                        .iter()
                        .map(|attribute| attribute.option.as_deref().unwrap_or(MISSING))
                        .collect::<Vec<_>>()
                        .join("  ");
                    let _ = writeln!(text, "- ID: {} | {options}", or_missing(&variation.id));
                }
                text.push('\n');
            }
        }
    }

    text.push_str(PRODUCT_FOOTER);
    text
}

fn attribute_header(variation: &ProductVariation) -> String {
    if variation.attributes.is_empty() {
        return "Atributos".to_string();
    }
    variation
        .attributes
        .iter()
        .map(|attribute| attribute.name.as_deref().unwrap_or("Atributo"))
        .collect::<Vec<_>>()
        .join(" y ")
}
