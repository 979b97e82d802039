use serde::{Deserialize, Serialize};

/// Product ids arrive as numbers from some catalogs and strings from others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductId::Number(n) => write!(f, "{}", n),
            ProductId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")] pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")] pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")] pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")] pub sizes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")] pub colors: Option<Vec<String>>,
}

/// Outbound body for a chat turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage<'a> {
    pub message: &'a str,
    pub chat_id: &'a str,
    pub hash_key: &'a str,
}

/// Outbound body for a history lookup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest<'a> {
    pub chat_id: &'a str,
    pub hash_key: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerReply {
    pub assistant_message: String,
    #[serde(default)]
    pub recommended_products: Option<Vec<Product>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AssistantReply {
    pub message: String,
    pub products: Vec<Product>,
}

impl From<ServerReply> for AssistantReply {
    fn from(reply: ServerReply) -> Self {
        Self {
            message: reply.assistant_message,
            products: reply.recommended_products.unwrap_or_default(),
        }
    }
}

/// Prior turns of a chat. Entries stay raw JSON since the server owns their shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistory {
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    #[serde(default)]
    pub recommended_products: Vec<Product>,
}

impl ChatHistory {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.recommended_products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reply_without_products_normalizes_to_empty() {
        let raw: ServerReply = serde_json::from_value(json!({"assistantMessage": "hello"})).unwrap();
        let reply = AssistantReply::from(raw);
        assert_eq!(reply.message, "hello");
        assert!(reply.products.is_empty());

        let raw: ServerReply = serde_json::from_value(json!({"assistantMessage": "x", "recommendedProducts": null})).unwrap();
        assert!(AssistantReply::from(raw).products.is_empty());
    }

    #[test]
    fn product_optional_fields_and_id_forms() {
        let full: Product = serde_json::from_value(json!({
            "id": 1,
            "name": "Nike Air Max 270",
            "description": "Comfortable running shoes",
            "price": 150.0,
            "image": "https://images.example.com/airmax.jpg",
            "url": "/products/nike-air-max-270",
            "brand": "Nike",
            "sizes": ["8", "9"],
            "colors": ["Black"]
        })).unwrap();
        assert_eq!(full.id, ProductId::Number(1));
        assert_eq!(full.brand.as_deref(), Some("Nike"));
        assert!(full.category.is_none());

        let minimal: Product = serde_json::from_value(json!({
            "id": "sku-42",
            "name": "Polo Shirt",
            "description": "Premium polo",
            "price": 45,
            "image": "https://images.example.com/polo.jpg"
        })).unwrap();
        assert_eq!(minimal.id.to_string(), "sku-42");
        assert_eq!(minimal.price, 45.0);
        assert!(minimal.sizes.is_none());
    }

    #[test]
    fn product_missing_required_field_is_rejected() {
        let res: Result<Product, _> = serde_json::from_value(json!({"id": 1, "name": "x"}));
        assert!(res.is_err());
    }

    #[test]
    fn outbound_bodies_use_camel_case() {
        let v = serde_json::to_value(ChatMessage { message: "hi", chat_id: "c", hash_key: "k" }).unwrap();
        assert_eq!(v, json!({"message": "hi", "chatId": "c", "hashKey": "k"}));
        let v = serde_json::to_value(HistoryRequest { chat_id: "c", hash_key: "k" }).unwrap();
        assert_eq!(v, json!({"chatId": "c", "hashKey": "k"}));
    }
}
