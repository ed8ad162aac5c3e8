//! Shop backend: product lookup, suggestions and cart calls.
//!
//! The widget talks to the shop only through [`ShopBackend`], so the HTTP
//! client can be swapped for an in-memory fake in tests.
//!
//! # Architecture
//!
//! - [`ShopBackend`]: the three remote operations the widget consumes
//! - [`HttpShopClient`]: reqwest implementation
//! - [`types`]: wire types and reply classification
//! - [`error`]: [`ShopError`] and the module `Result`

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;

pub use client::HttpShopClient;
pub use error::{Result, ShopError};
pub use types::{CartReply, ProductCard, ProductReply, Scalar, Suggestion};

/// Remote operations behind the chat widget.
///
/// Implementations must not retry; every call is one round trip.
#[async_trait]
pub trait ShopBackend: Send + Sync + std::fmt::Debug {
    /// `GET /get_product?product=<query>`.
    async fn lookup_product(&self, query: &str) -> Result<ProductReply>;

    /// `POST /api/add-to-cart` with `{ "product": product }`.
    async fn add_to_cart(&self, product: &str) -> Result<CartReply>;

    /// `GET /get_suggestions?q=<query>`.
    async fn suggestions(&self, query: &str) -> Result<Vec<Suggestion>>;
}
