//! The chat widget: data model, controller and HTML rendering.
//!
//! - [`message`]: [`Message`], [`Sender`] and the append-only [`ChatLog`]
//! - [`controller`]: [`ChatWidget`], one per session
//! - [`render`]: escaped HTML fragments and the widget page

pub mod controller;
pub mod message;
pub mod render;

pub use controller::{ChatWidget, ReplyOrdering, WidgetSettings};
pub use message::{ChatLog, Message, MessageBody, Sender};
