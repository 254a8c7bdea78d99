//! `[ACTION](name) {...}` markers embedded in model replies.
//!
//! Only the first marker counts. The payload is the first balanced JSON object
//! after the marker; anything after it is ignored.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[ACTION\]\(([A-Za-z0-9_]+)\)\s*\{").expect("directive marker pattern is valid")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionKind {
    PlaceOrder,
    GetOrder,
    SearchProducts,
    Other(String),
}

impl ActionKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "place_order" => Self::PlaceOrder,
            "get_order" => Self::GetOrder,
            "search_products" => Self::SearchProducts,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::PlaceOrder => "place_order",
            Self::GetOrder => "get_order",
            Self::SearchProducts => "search_products",
            Self::Other(name) => name,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActionDirective {
    pub kind: ActionKind,
    pub raw_parameters: String,
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("parameters for action `{action}` are not a JSON object: {message}")]
    Malformed { action: String, message: String },
}

/// Finds the first directive in `text`. `Ok(None)` means the reply is plain text.
pub fn parse_directive(text: &str) -> Result<Option<ActionDirective>, DirectiveError> {
    let Some(captures) = MARKER.captures(text) else {
        return Ok(None);
    };
    let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
        return Ok(None);
    };

    let kind = ActionKind::from_name(name.as_str());
    let payload_start = whole.end() - 1;
    let payload = &text[payload_start..];

    let mut stream = serde_json::Deserializer::from_str(payload).into_iter::<Map<String, Value>>();
    match stream.next() {
        Some(Ok(parameters)) => {
            let raw_parameters = payload[..stream.byte_offset()].to_string();
            Ok(Some(ActionDirective { kind, raw_parameters, parameters }))
        }
        Some(Err(err)) => Err(DirectiveError::Malformed {
            action: kind.as_str().to_string(),
            message: err.to_string(),
        }),
        None => Err(DirectiveError::Malformed {
            action: kind.as_str().to_string(),
            message: "missing parameter object".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{parse_directive, ActionKind, DirectiveError};

    #[test]
    fn plain_text_has_no_directive() {
        let parsed = parse_directive("¡Hola! ¿En qué te puedo ayudar hoy?").expect("parse");
        assert_eq!(parsed, None);
    }

    #[test]
    fn marker_without_object_is_plain_text() {
        let parsed = parse_directive("Usa [ACTION](get_order) cuando tengas el número").expect("parse");
        assert_eq!(parsed, None);
    }

    #[test]
    fn multiline_payload_with_nested_objects_is_parsed() {
        let reply = "Perfecto, registro tu pedido.\n[ACTION](place_order)\n{\n  \"billing\": {\"first_name\": \"Ana\"},\n  \"line_items\": [{\"product_id\": \"9\", \"quantity\": 1}]\n}\nGracias!";
        let directive = parse_directive(reply).expect("parse").expect("directive");

        assert_eq!(directive.kind, ActionKind::PlaceOrder);
        assert_eq!(directive.parameters["billing"], json!({"first_name": "Ana"}));
        assert!(directive.raw_parameters.starts_with('{'));
        assert!(directive.raw_parameters.ends_with('}'));
        assert!(!directive.raw_parameters.contains("Gracias"));
    }

    #[test]
    fn braces_inside_strings_do_not_end_the_object() {
        let reply = r#"[ACTION](search_products) {"query": "reloj }{ dorado"} y más texto {"x": 1}"#;
        let directive = parse_directive(reply).expect("parse").expect("directive");

        assert_eq!(directive.kind, ActionKind::SearchProducts);
        assert_eq!(directive.parameters["query"], json!("reloj }{ dorado"));
    }

    #[test]
    fn only_first_marker_is_honored() {
        let reply = r#"[ACTION](get_order) {"order_id": "456"} [ACTION](search_products) {"query": "x"}"#;
        let directive = parse_directive(reply).expect("parse").expect("directive");

        assert_eq!(directive.kind, ActionKind::GetOrder);
        assert_eq!(directive.parameters["order_id"], json!("456"));
    }

    #[test]
    fn unknown_names_are_kept() {
        let directive =
            parse_directive(r#"[ACTION](cancel_order) {"order_id": 1}"#).expect("parse").expect("directive");
        assert_eq!(directive.kind, ActionKind::Other("cancel_order".to_string()));
        assert_eq!(directive.kind.as_str(), "cancel_order");
    }

    #[test]
    fn broken_json_is_malformed() {
        let result = parse_directive(r#"[ACTION](get_order) {"order_id": 456,}"#);
        assert!(matches!(
            result,
            Err(DirectiveError::Malformed { ref action, .. }) if action == "get_order"
        ));

        let truncated = parse_directive(r#"[ACTION](get_order) {"order_id": "4"#);
        assert!(matches!(truncated, Err(DirectiveError::Malformed { .. })));
    }
}
