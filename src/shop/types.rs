//! Wire types for the product lookup, suggestion and cart endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{Result, ShopError};

/// A JSON number or string shown to the shopper as-is.
///
/// The lookup service is loose about types: `price` arrives as `120` or as
/// `"120.00"`, `stock` as `5` or as `"5 available"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

/// Product details rendered as a card in the chat log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCard {
    /// Display name, also the key sent to the cart endpoint.
    pub product: String,
    #[serde(default)]
    pub price: Option<Scalar>,
    #[serde(default)]
    pub stock: Option<Scalar>,
    /// External purchase page.
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Classified reply of `GET /get_product`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductReply {
    /// The service flagged the query with an `error` field.
    NotFound,
    /// Free-form reply text, e.g. order tracking or greetings.
    Message(String),
    /// A matching product.
    Product(ProductCard),
}

/// Raw lookup body before classification.
#[derive(Debug, Default, Deserialize)]
struct RawProductReply {
    #[serde(default)]
    error: Value,
    #[serde(default)]
    message: Value,
    #[serde(default)]
    product: Value,
    #[serde(default)]
    price: Option<Scalar>,
    #[serde(default)]
    stock: Option<Scalar>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

impl ProductReply {
    /// Decode a lookup body.
    ///
    /// A truthy `error` wins over a truthy `message`, which wins over the
    /// product fields. A body with none of the three is rejected.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let raw: RawProductReply = serde_json::from_slice(body)?;
        Self::try_from(raw)
    }
}

impl TryFrom<RawProductReply> for ProductReply {
    type Error = ShopError;

    fn try_from(raw: RawProductReply) -> Result<Self> {
        if is_truthy(&raw.error) {
            return Ok(Self::NotFound);
        }
        if is_truthy(&raw.message) {
            return Ok(Self::Message(value_text(&raw.message)));
        }
        let product = match raw.product {
            Value::Null => {
                return Err(ShopError::UnexpectedReply(
                    "reply has no error, message or product field".to_string(),
                ));
            }
            other => value_text(&other),
        };
        Ok(Self::Product(ProductCard {
            product,
            price: raw.price,
            stock: raw.stock,
            link: raw.link,
            image: raw.image.filter(|s| !s.trim().is_empty()),
        }))
    }
}

/// Body of `POST /api/add-to-cart`.
#[derive(Debug, Serialize)]
pub struct CartRequest<'a> {
    pub product: &'a str,
}

/// Reply of the cart endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartReply {
    #[serde(default)]
    success: Value,
}

impl CartReply {
    /// Build a reply with an explicit outcome.
    pub fn new(success: bool) -> Self {
        Self {
            success: Value::Bool(success),
        }
    }

    /// Whether the cart accepted the product.
    pub fn succeeded(&self) -> bool {
        is_truthy(&self.success)
    }
}

/// One entry of `GET /get_suggestions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    #[serde(default)]
    pub price: Option<Scalar>,
}

/// Loose truthiness: null, false, zero, and empty strings are false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(body: &str) -> Result<ProductReply> {
        ProductReply::from_slice(body.as_bytes())
    }

    #[test]
    fn test_error_field_means_not_found() {
        assert_eq!(decode(r#"{"error": true}"#).unwrap(), ProductReply::NotFound);
        assert_eq!(
            decode(r#"{"error": "No message provided.", "message": "ignored"}"#).unwrap(),
            ProductReply::NotFound
        );
    }

    #[test]
    fn test_falsy_error_falls_through() {
        assert_eq!(
            decode(r#"{"error": false, "message": "Order shipped"}"#).unwrap(),
            ProductReply::Message("Order shipped".to_string())
        );
    }

    #[test]
    fn test_product_with_numeric_fields() {
        let reply = decode(
            r#"{"product": "Mango", "price": 120, "stock": 5, "link": "https://x", "image": "y.jpg"}"#,
        )
        .unwrap();

        let ProductReply::Product(card) = reply else {
            panic!("expected a product card");
        };
        assert_eq!(card.product, "Mango");
        assert_eq!(card.price.unwrap().to_string(), "120");
        assert_eq!(card.stock.unwrap().to_string(), "5");
        assert_eq!(card.link.as_deref(), Some("https://x"));
        assert_eq!(card.image.as_deref(), Some("y.jpg"));
    }

    #[test]
    fn test_product_with_string_fields_and_blank_image() {
        let reply = decode(
            r##"{"product": "Banana", "price": "45.00", "stock": "Out of stock", "link": "#", "image": "", "stock_status": "out_of_stock"}"##,
        )
        .unwrap();

        let ProductReply::Product(card) = reply else {
            panic!("expected a product card");
        };
        assert_eq!(card.price, Some(Scalar::from("45.00")));
        assert_eq!(card.stock, Some(Scalar::from("Out of stock")));
        assert!(card.image.is_none());
    }

    #[test]
    fn test_unrecognised_shapes_are_rejected() {
        assert!(matches!(
            decode(r#"{"unrelated": 1}"#),
            Err(ShopError::UnexpectedReply(_))
        ));
        assert!(matches!(decode("<html>"), Err(ShopError::Json(_))));
    }

    #[test]
    fn test_cart_reply_truthiness() {
        let ok: CartReply = serde_json::from_str(r#"{"success": true}"#).unwrap();
        let refused: CartReply = serde_json::from_str(r#"{"success": false}"#).unwrap();
        let empty: CartReply = serde_json::from_str("{}").unwrap();

        assert!(ok.succeeded());
        assert!(!refused.succeeded());
        assert!(!empty.succeeded());
    }
}
