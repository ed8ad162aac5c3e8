//! Farm2Bag shopping chat widget
//!
//! An HTML-first chat widget that lets a shopper look up products, see
//! them as cards in a chat log, and add them to a cart.
//!
//! # Architecture
//!
//! - **Server**: Axum-based HTTP server returning HTML fragments for htmx
//! - **Widget**: one controller per session owning an append-only chat log
//! - **Shop**: reqwest client for the product lookup and cart services
//!
//! # Modules
//!
//! - [`config`]: layered configuration (defaults, file, env, CLI)
//! - [`server`]: router, handlers and startup
//! - [`session`]: session storage
//! - [`shop`]: shop backend trait and HTTP client
//! - [`widget`]: chat log, controller and rendering

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod server;
pub mod session;
pub mod shop;
pub mod widget;

use crate::config::AppConfig;

use session::SessionStore;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Session store; each session owns one chat widget.
    pub sessions: SessionStore,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}
