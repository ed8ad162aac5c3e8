//! HTML rendering for the chat widget.
//!
//! Every value that reaches the page goes through [`escape_html`], except
//! shop replies that carry inline markup: those pass an allowlist sanitizer
//! keeping only `<strong>`, `<em>`, `<br>` and http(s) links. Link and image
//! URLs are additionally restricted to `http`, `https` or relative paths.

use std::collections::HashSet;
use std::fmt::Write as _;

use url::Url;

use super::message::{Message, MessageBody};
use crate::shop::{ProductCard, Suggestion};

/// Escape the five HTML-significant characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Escaped text with line breaks kept.
fn text_html(s: &str) -> String {
    escape_html(s).replace('\n', "<br>")
}

/// Shop reply markup reduced to inline emphasis, line breaks and http(s)
/// links opening in a new tab. Everything else is stripped.
#[must_use]
pub fn sanitize_markup(raw: &str) -> String {
    ammonia::Builder::empty()
        .add_tags(["strong", "b", "em", "br", "a"])
        .add_tag_attributes("a", ["href", "target"])
        .url_schemes(HashSet::from(["http", "https"]))
        .link_rel(Some("noopener noreferrer"))
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(&raw.replace('\n', "<br>"))
        .to_string()
}

/// Escaped URL, or `None` for schemes other than http(s).
fn safe_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(escape_html(raw)),
        Ok(_) => None,
        Err(url::ParseError::RelativeUrlWithoutBase) => Some(escape_html(raw)),
        Err(_) => None,
    }
}

/// One chat bubble.
#[must_use]
pub fn bubble(message: &Message, currency: &str) -> String {
    let inner = match &message.body {
        MessageBody::Text { text } => text_html(text),
        MessageBody::Markup { text } => sanitize_markup(text),
        MessageBody::Product(card) => product_card(card, currency),
    };
    format!(
        r#"<div class="{}">{inner}</div>"#,
        message.sender.css_class()
    )
}

/// Bubbles for several messages, concatenated in order.
#[must_use]
pub fn bubbles(messages: &[Message], currency: &str) -> String {
    messages.iter().map(|m| bubble(m, currency)).collect()
}

/// Product card with buy link and add-to-cart action.
#[must_use]
pub fn product_card(card: &ProductCard, currency: &str) -> String {
    let name = escape_html(&card.product);
    let mut html = String::from(r#"<div class="product-card">"#);

    if let Some(src) = card.image.as_deref().and_then(safe_url) {
        let _ = write!(
            html,
            r#"<img src="{src}" class="product-image" alt="{name}">"#
        );
    }
    let _ = write!(html, "<div><strong>Product:</strong> {name}</div>");
    if let Some(price) = &card.price {
        let _ = write!(
            html,
            "<div><strong>Price:</strong> {}{}</div>",
            escape_html(currency),
            escape_html(&price.to_string())
        );
    }
    if let Some(stock) = &card.stock {
        let _ = write!(
            html,
            "<div><strong>Stock:</strong> {}</div>",
            escape_html(&stock.to_string())
        );
    }

    let href = card
        .link
        .as_deref()
        .and_then(safe_url)
        .unwrap_or_else(|| "#".to_string());
    let _ = write!(
        html,
        r#"<a href="{href}" target="_blank" rel="noopener noreferrer" class="buy-btn">Buy</a>"#
    );
    let _ = write!(
        html,
        r##"<form class="cart-form" hx-post="/chat/cart" hx-target="#chat-box" hx-swap="beforeend scroll:bottom" hx-include="#session-id"><input type="hidden" name="product" value="{name}"><button type="submit" class="cart-btn">Add to Cart</button></form>"##
    );
    html.push_str("</div>");
    html
}

/// `<option>` entries for the suggestion datalist.
#[must_use]
pub fn suggestion_options(suggestions: &[Suggestion]) -> String {
    suggestions
        .iter()
        .map(|s| {
            let name = escape_html(&s.name);
            match &s.price {
                Some(price) => format!(
                    r#"<option value="{name}">{}</option>"#,
                    escape_html(&price.to_string())
                ),
                None => format!(r#"<option value="{name}"></option>"#),
            }
        })
        .collect()
}

/// Full widget page for one session.
#[must_use]
pub fn page(session_id: &str, messages: &[Message], currency: &str) -> String {
    let session_id = escape_html(session_id);
    let log = bubbles(messages, currency);
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Farm2Bag Assistant</title>
    <script src="https://unpkg.com/htmx.org@2.0.8/dist/htmx.min.js"></script>
    <link rel="stylesheet" href="/static/chat.css">
</head>
<body>
    <div class="chat-container">
        <h2 class="chat-title">Farm2Bag Assistant</h2>
        <div id="chat-box" class="chat-box" aria-live="polite">{log}</div>
        <form
            id="chat-form"
            class="chat-input"
            hx-post="/chat/send"
            hx-target="#chat-box"
            hx-swap="beforeend scroll:bottom"
            hx-sync="this:queue all"
            hx-on::config-request="if (event.detail.elt === this) this.reset()"
        >
            <input type="hidden" id="session-id" name="session_id" value="{session_id}">
            <input
                type="text"
                id="user-input"
                name="message"
                placeholder="Type a product name..."
                autocomplete="off"
                list="product-suggestions"
                hx-get="/chat/suggestions"
                hx-trigger="keyup changed delay:300ms"
                hx-target="#product-suggestions"
                hx-swap="innerHTML"
                hx-include="#session-id"
            >
            <datalist id="product-suggestions"></datalist>
            <button type="submit">Send</button>
        </form>
    </div>
</body>
</html>"##
    )
}
