//! Session management.
//!
//! This module provides in-memory storage for chat sessions. Each session
//! is identified by UUID and owns one chat widget with its message log.
//!
//! # Architecture
//!
//! - [`Session`]: a single chat session
//! - [`SessionStore`]: thread-safe store for all active sessions

mod thread;

pub use thread::{Session, SessionStore};
