//! The chat widget controller.
//!
//! One [`ChatWidget`] exists per chat session. It owns the session's
//! [`ChatLog`] and reaches the shop through an injected [`ShopBackend`].
//! Every operation is a single request/response round trip; failures are
//! turned into bot messages and never returned to the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::message::{ChatLog, Message, MessageBody, Sender};
use super::render;
use crate::shop::{ProductReply, ShopBackend, Suggestion};

/// Reply shown when the lookup service flags an error.
pub const PRODUCT_NOT_FOUND: &str = "Product not found.";
/// Reply shown when the lookup fails in transport or decoding.
pub const CONNECTION_ERROR: &str = "Error connecting to the server.";
/// Reply shown when the cart call fails in transport or decoding.
pub const CART_ERROR: &str = "⚠️ Error adding to cart.";

/// Shortest query that triggers a suggestion request.
const MIN_SUGGESTION_QUERY: usize = 2;

/// What to do with a lookup reply that arrives after a newer send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyOrdering {
    /// Append every reply as it arrives.
    #[default]
    Unordered,
    /// Drop lookup replies superseded by a later send.
    DiscardStale,
}

/// Presentation and ordering settings for a widget.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WidgetSettings {
    /// Prefix for prices on product cards.
    pub currency_symbol: String,
    pub reply_ordering: ReplyOrdering,
    /// Maximum number of suggestions shown.
    pub suggestion_limit: usize,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            currency_symbol: "₹".to_string(),
            reply_ordering: ReplyOrdering::Unordered,
            suggestion_limit: 10,
        }
    }
}

/// Chat widget controller for one session.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use farm2bag_chat::shop::HttpShopClient;
/// use farm2bag_chat::widget::{ChatWidget, WidgetSettings};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = HttpShopClient::new(
///     "http://127.0.0.1:5000/get_product",
///     "http://127.0.0.1:5000/get_suggestions",
///     "https://farm2bag.com/api/add-to-cart",
/// )?;
/// let widget = ChatWidget::new(Arc::new(backend), WidgetSettings::default());
///
/// let appended = widget.send_message("  mango ").await;
/// assert_eq!(appended.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ChatWidget {
    backend: Arc<dyn ShopBackend>,
    settings: WidgetSettings,
    log: ChatLog,
    /// Number of sends submitted so far.
    submitted: AtomicU64,
}

impl ChatWidget {
    #[must_use]
    pub fn new(backend: Arc<dyn ShopBackend>, settings: WidgetSettings) -> Self {
        Self {
            backend,
            settings,
            log: ChatLog::new(),
            submitted: AtomicU64::new(0),
        }
    }

    /// Copy of the chat log.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.log.snapshot()
    }

    #[must_use]
    pub fn message_count(&self) -> usize {
        self.log.len()
    }

    /// Append a bubble to the log and return it.
    ///
    /// No validation: text bodies are escaped and markup bodies sanitized
    /// when rendered.
    pub fn append_message(&self, body: impl Into<MessageBody>, sender: Sender) -> Message {
        let message = Message::new(body, sender);
        self.log.push(message.clone());
        message
    }

    /// Render a bubble with this widget's currency symbol.
    #[must_use]
    pub fn render(&self, message: &Message) -> String {
        render::bubble(message, &self.settings.currency_symbol)
    }

    /// Render several bubbles in order.
    #[must_use]
    pub fn render_all(&self, messages: &[Message]) -> String {
        render::bubbles(messages, &self.settings.currency_symbol)
    }

    /// Look up the shopper's input and append the exchange.
    ///
    /// Returns the messages appended by this call, in order: nothing for
    /// blank input, otherwise the user bubble followed by at most one bot
    /// bubble.
    pub async fn send_message(&self, input: &str) -> Vec<Message> {
        let text = input.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let ticket = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
        let user = self.append_message(text, Sender::User);
        info!(name: "chat.send", ticket = ticket, length = text.len(), "Product lookup requested");

        let body = match self.backend.lookup_product(text).await {
            Ok(ProductReply::NotFound) => MessageBody::text(PRODUCT_NOT_FOUND),
            Ok(ProductReply::Message(message)) => MessageBody::markup(message),
            Ok(ProductReply::Product(card)) => MessageBody::Product(card),
            Err(e) => {
                warn!(name: "shop.request.failed", operation = "lookup", error = %e, "Product lookup failed");
                MessageBody::text(CONNECTION_ERROR)
            }
        };

        if self.settings.reply_ordering == ReplyOrdering::DiscardStale
            && self.submitted.load(Ordering::SeqCst) != ticket
        {
            debug!(name: "chat.reply.discarded", ticket = ticket, "Dropped reply superseded by a newer send");
            return vec![user];
        }

        let reply = self.append_message(body, Sender::Bot);
        info!(name: "chat.reply", ticket = ticket, "Lookup reply appended");
        vec![user, reply]
    }

    /// Add a product to the cart and append the outcome.
    pub async fn add_to_cart(&self, product: &str) -> Message {
        let text = match self.backend.add_to_cart(product).await {
            Ok(reply) if reply.succeeded() => {
                info!(name: "cart.add", product = %product, success = true, "Product added to cart");
                format!("✅ {product} has been added to your cart!")
            }
            Ok(_) => {
                info!(name: "cart.add", product = %product, success = false, "Cart refused product");
                format!("❌ Failed to add {product} to cart.")
            }
            Err(e) => {
                warn!(name: "shop.request.failed", operation = "cart", error = %e, "Add to cart failed");
                CART_ERROR.to_string()
            }
        };
        self.append_message(text, Sender::Bot)
    }

    /// Product name suggestions for a partial query.
    ///
    /// Queries shorter than two characters return nothing without a
    /// request; failures also return nothing. The log is never touched.
    pub async fn suggest(&self, query: &str) -> Vec<Suggestion> {
        suggest_with(self.backend.as_ref(), &self.settings, query).await
    }
}

/// Suggestion lookup shared by widgets and callers without a session.
pub(crate) async fn suggest_with(
    backend: &dyn ShopBackend,
    settings: &WidgetSettings,
    query: &str,
) -> Vec<Suggestion> {
    let query = query.trim();
    if query.chars().count() < MIN_SUGGESTION_QUERY {
        return Vec::new();
    }
    match backend.suggestions(query).await {
        Ok(mut suggestions) => {
            suggestions.truncate(settings.suggestion_limit);
            suggestions
        }
        Err(e) => {
            warn!(name: "shop.request.failed", operation = "suggestions", error = %e, "Suggestion lookup failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shop::{CartReply, ProductCard, Result as ShopResult, Scalar, ShopError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Scripted backend: replies are popped in call order.
    #[derive(Debug, Default)]
    struct FakeShop {
        lookups: Mutex<VecDeque<ShopResult<ProductReply>>>,
        carts: Mutex<VecDeque<ShopResult<CartReply>>>,
        suggestions: Mutex<Vec<Suggestion>>,
        calls: AtomicUsize,
        /// When set, the first lookup waits for this before replying.
        gate: Option<Arc<Notify>>,
    }

    impl FakeShop {
        fn with_lookup(reply: ShopResult<ProductReply>) -> Self {
            let shop = Self::default();
            shop.lookups.lock().unwrap().push_back(reply);
            shop
        }

        fn with_cart(reply: ShopResult<CartReply>) -> Self {
            let shop = Self::default();
            shop.carts.lock().unwrap().push_back(reply);
            shop
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ShopBackend for FakeShop {
        async fn lookup_product(&self, _query: &str) -> ShopResult<ProductReply> {
            let reply = self.lookups.lock().unwrap().pop_front();
            let first = self.calls.fetch_add(1, Ordering::SeqCst) == 0;
            if first {
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
            }
            reply.unwrap_or(Err(ShopError::UnexpectedReply("no scripted reply".into())))
        }

        async fn add_to_cart(&self, _product: &str) -> ShopResult<CartReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.carts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ShopError::UnexpectedReply("no scripted reply".into())))
        }

        async fn suggestions(&self, _query: &str) -> ShopResult<Vec<Suggestion>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.suggestions.lock().unwrap().clone())
        }
    }

    fn widget(shop: &Arc<FakeShop>) -> ChatWidget {
        let backend: Arc<dyn ShopBackend> = Arc::clone(shop) as Arc<dyn ShopBackend>;
        ChatWidget::new(backend, WidgetSettings::default())
    }

    fn transport_error() -> ShopError {
        ShopError::Json(serde_json::from_str::<serde_json::Value>("{").unwrap_err())
    }

    #[tokio::test]
    async fn test_blank_input_is_a_no_op() {
        let shop = Arc::new(FakeShop::default());
        let widget = widget(&shop);

        assert!(widget.send_message("").await.is_empty());
        assert!(widget.send_message("   \t\n").await.is_empty());
        assert_eq!(widget.message_count(), 0);
        assert_eq!(shop.calls(), 0);
    }

    #[tokio::test]
    async fn test_not_found_reply() {
        let shop = Arc::new(FakeShop::with_lookup(Ok(ProductReply::NotFound)));
        let widget = widget(&shop);

        let appended = widget.send_message("  durian  ").await;

        assert_eq!(appended.len(), 2);
        assert_eq!(appended[0].sender, Sender::User);
        assert_eq!(appended[0].text(), Some("durian"));
        assert_eq!(appended[1].sender, Sender::Bot);
        assert_eq!(appended[1].text(), Some(PRODUCT_NOT_FOUND));
        assert_eq!(widget.messages(), appended);
    }

    #[tokio::test]
    async fn test_message_reply_is_verbatim() {
        let shop = Arc::new(FakeShop::with_lookup(Ok(ProductReply::Message(
            "Order shipped".to_string(),
        ))));
        let widget = widget(&shop);

        let appended = widget.send_message("where is my order").await;
        assert_eq!(appended[1].text(), Some("Order shipped"));
        assert_eq!(appended[1].body, MessageBody::markup("Order shipped"));
    }

    #[tokio::test]
    async fn test_product_reply_renders_card() {
        let card = ProductCard {
            product: "Mango".to_string(),
            price: Some(Scalar::from(120_u64)),
            stock: Some(Scalar::from(5_u64)),
            link: Some("https://x".to_string()),
            image: Some("y.jpg".to_string()),
        };
        let shop = Arc::new(FakeShop::with_lookup(Ok(ProductReply::Product(card.clone()))));
        let widget = widget(&shop);

        let appended = widget.send_message("mango").await;
        assert_eq!(appended[1].body, MessageBody::Product(card));

        let html = widget.render(&appended[1]);
        assert!(html.contains("Mango"));
        assert!(html.contains("₹120"));
        assert!(html.contains("<strong>Stock:</strong> 5"));
        assert!(html.contains(r#"href="https://x""#));
    }

    #[tokio::test]
    async fn test_lookup_failure_becomes_connection_error() {
        let shop = Arc::new(FakeShop::with_lookup(Err(transport_error())));
        let widget = widget(&shop);

        let appended = widget.send_message("mango").await;
        assert_eq!(appended.len(), 2);
        assert_eq!(appended[1].text(), Some(CONNECTION_ERROR));
    }

    #[tokio::test]
    async fn test_cart_outcomes() {
        let ok = Arc::new(FakeShop::with_cart(Ok(CartReply::new(true))));
        let message = widget(&ok).add_to_cart("Mango").await;
        let text = message.text().unwrap();
        assert!(text.contains("Mango"));
        assert!(text.starts_with('✅'));

        let refused = Arc::new(FakeShop::with_cart(Ok(CartReply::new(false))));
        let message = widget(&refused).add_to_cart("Mango").await;
        let text = message.text().unwrap();
        assert!(text.contains("Mango"));
        assert!(text.starts_with('❌'));

        let broken = Arc::new(FakeShop::with_cart(Err(transport_error())));
        let message = widget(&broken).add_to_cart("Mango").await;
        assert_eq!(message.text(), Some(CART_ERROR));
        assert_eq!(message.sender, Sender::Bot);
    }

    #[tokio::test]
    async fn test_suggest_skips_short_queries_and_truncates() {
        let shop = Arc::new(FakeShop::default());
        *shop.suggestions.lock().unwrap() = (0..15)
            .map(|i| Suggestion {
                name: format!("Mango {i}"),
                price: None,
            })
            .collect();
        let widget = widget(&shop);

        assert!(widget.suggest(" m ").await.is_empty());
        assert_eq!(shop.calls(), 0);

        let suggestions = widget.suggest("ma").await;
        assert_eq!(suggestions.len(), 10);
        assert_eq!(widget.message_count(), 0);
    }

    async fn overlapping_sends(ordering: ReplyOrdering) -> Vec<Message> {
        let gate = Arc::new(Notify::new());
        let shop = FakeShop {
            gate: Some(Arc::clone(&gate)),
            ..FakeShop::default()
        };
        shop.lookups
            .lock()
            .unwrap()
            .push_back(Ok(ProductReply::Message("first".into())));
        shop.lookups
            .lock()
            .unwrap()
            .push_back(Ok(ProductReply::Message("second".into())));
        let shop = Arc::new(shop);
        let backend: Arc<dyn ShopBackend> = Arc::clone(&shop) as Arc<dyn ShopBackend>;
        let widget = Arc::new(ChatWidget::new(
            backend,
            WidgetSettings {
                reply_ordering: ordering,
                ..WidgetSettings::default()
            },
        ));

        let slow = tokio::spawn({
            let widget = Arc::clone(&widget);
            async move { widget.send_message("apple").await }
        });
        while shop.calls() == 0 {
            tokio::task::yield_now().await;
        }

        widget.send_message("banana").await;
        gate.notify_one();
        slow.await.unwrap();

        widget.messages()
    }

    #[tokio::test]
    async fn test_unordered_keeps_late_reply() {
        let texts: Vec<_> = overlapping_sends(ReplyOrdering::Unordered)
            .await
            .iter()
            .map(|m| m.text().unwrap_or_default().to_string())
            .collect();

        assert_eq!(texts, ["apple", "banana", "second", "first"]);
    }

    #[tokio::test]
    async fn test_discard_stale_drops_late_reply() {
        let texts: Vec<_> = overlapping_sends(ReplyOrdering::DiscardStale)
            .await
            .iter()
            .map(|m| m.text().unwrap_or_default().to_string())
            .collect();

        assert_eq!(texts, ["apple", "banana", "second"]);
    }
}
