//! HTTP implementation of [`ShopBackend`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::ShopBackend;
use super::error::Result;
use super::types::{CartReply, CartRequest, ProductReply, Suggestion};
use crate::config::ShopConfig;

/// Shop backend reached over HTTP.
///
/// # Example
///
/// ```rust,no_run
/// use farm2bag_chat::shop::{HttpShopClient, ShopBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpShopClient::new(
///     "http://127.0.0.1:5000/get_product",
///     "http://127.0.0.1:5000/get_suggestions",
///     "https://farm2bag.com/api/add-to-cart",
/// )?;
/// let reply = client.lookup_product("mango").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpShopClient {
    lookup_url: Url,
    suggestions_url: Url,
    cart_url: Url,
    http: reqwest::Client,
}

impl HttpShopClient {
    /// Create a client for the three endpoints.
    pub fn new(
        lookup_url: impl AsRef<str>,
        suggestions_url: impl AsRef<str>,
        cart_url: impl AsRef<str>,
    ) -> Result<Self> {
        Self::with_client(lookup_url, suggestions_url, cart_url, reqwest::Client::new())
    }

    /// Create a client with a custom reqwest client.
    pub fn with_client(
        lookup_url: impl AsRef<str>,
        suggestions_url: impl AsRef<str>,
        cart_url: impl AsRef<str>,
        http: reqwest::Client,
    ) -> Result<Self> {
        Ok(Self {
            lookup_url: Url::parse(lookup_url.as_ref())?,
            suggestions_url: Url::parse(suggestions_url.as_ref())?,
            cart_url: Url::parse(cart_url.as_ref())?,
            http,
        })
    }

    /// Create a client from the `shop` config section.
    pub fn from_config(config: &ShopConfig) -> Result<Self> {
        Self::new(&config.lookup_url, &config.suggestions_url, &config.cart_url)
    }

    fn with_query(base: &Url, key: &str, value: &str) -> Url {
        let mut url = base.clone();
        url.query_pairs_mut().append_pair(key, value);
        url
    }

    /// Read the body regardless of status, the way a browser fetch does.
    async fn read_body(response: reqwest::Response) -> Result<Vec<u8>> {
        let status = response.status();
        let url = response.url().clone();
        if !status.is_success() {
            warn!(
                name: "shop.response.status",
                url = %url,
                status = status.as_u16(),
                "Shop endpoint returned a non-success status"
            );
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let body = Self::read_body(response).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ShopBackend for HttpShopClient {
    async fn lookup_product(&self, query: &str) -> Result<ProductReply> {
        let url = Self::with_query(&self.lookup_url, "product", query);
        debug!(name: "shop.lookup", url = %url, "Looking up product");
        let response = self.http.get(url).send().await?;
        let body = Self::read_body(response).await?;
        ProductReply::from_slice(&body)
    }

    async fn add_to_cart(&self, product: &str) -> Result<CartReply> {
        debug!(name: "shop.cart", url = %self.cart_url, product = %product, "Adding product to cart");
        let response = self
            .http
            .post(self.cart_url.clone())
            .json(&CartRequest { product })
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn suggestions(&self, query: &str) -> Result<Vec<Suggestion>> {
        let url = Self::with_query(&self.suggestions_url, "q", query);
        let response = self.http.get(url).send().await?;
        Self::read_json(response).await
    }
}
