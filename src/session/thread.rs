//! Chat sessions and session storage.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::shop::{ShopBackend, Suggestion};
use crate::widget::controller::suggest_with;
use crate::widget::{ChatWidget, WidgetSettings};

/// A single chat session.
///
/// Sessions own one [`ChatWidget`] and with it the chat log. Cloning is
/// cheap and shares the same widget.
#[derive(Debug)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Unique session identifier.
    id: String,
    widget: ChatWidget,
    last_activity: RwLock<DateTime<Utc>>,
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Session {
    fn new(id: String, widget: ChatWidget) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id,
                widget,
                last_activity: RwLock::new(Utc::now()),
            }),
        }
    }

    /// Get the session ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The session's widget controller.
    #[must_use]
    pub fn widget(&self) -> &ChatWidget {
        &self.inner.widget
    }

    /// Update the last activity timestamp.
    pub fn touch(&self) {
        let mut guard = self
            .inner
            .last_activity
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Utc::now();
    }

    /// Check if the session has been idle longer than `timeout`.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        let last = *self
            .inner
            .last_activity
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match (Utc::now() - last).to_std() {
            Ok(idle) => idle > timeout,
            // Negative duration: clock skew.
            Err(_) => false,
        }
    }
}

/// Thread-safe store for sessions.
///
/// Every session it creates gets a widget wired to the same backend and
/// settings.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, Session>>,
    backend: Arc<dyn ShopBackend>,
    settings: WidgetSettings,
}

impl SessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(backend: Arc<dyn ShopBackend>, settings: WidgetSettings) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
                backend,
                settings,
            }),
        }
    }

    /// Widget settings applied to new sessions.
    #[must_use]
    pub fn settings(&self) -> &WidgetSettings {
        &self.inner.settings
    }

    /// Create a new session and return it.
    #[must_use]
    pub fn create(&self) -> Session {
        self.create_with_id(Uuid::new_v4().to_string())
    }

    /// Create a new session with a specific ID, replacing any existing one.
    #[must_use]
    pub fn create_with_id(&self, id: impl Into<String>) -> Session {
        let id = id.into();
        let widget = self.new_widget();
        let session = Session::new(id.clone(), widget);
        self.write().insert(id, session.clone());
        session
    }

    /// Get a session by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        self.read().get(id).cloned()
    }

    /// Get a session by ID, creating it if it doesn't exist.
    #[must_use]
    pub fn get_or_create(&self, id: &str) -> Session {
        if let Some(session) = self.get(id) {
            return session;
        }
        let mut guard = self.write();
        // Another request may have created it in between.
        if let Some(session) = guard.get(id) {
            return session.clone();
        }
        let widget = self.new_widget();
        let session = Session::new(id.to_string(), widget);
        guard.insert(id.to_string(), session.clone());
        session
    }

    /// Session for a form-supplied ID: a fresh one when blank, otherwise
    /// the existing or newly created session. The session is touched.
    #[must_use]
    pub fn resolve(&self, id: &str) -> Session {
        let id = id.trim();
        let session = if id.is_empty() {
            self.create()
        } else {
            self.get_or_create(id)
        };
        session.touch();
        session
    }

    /// Suggestions for a caller without a live session. No session is
    /// created.
    pub async fn suggest(&self, query: &str) -> Vec<Suggestion> {
        suggest_with(self.inner.backend.as_ref(), &self.inner.settings, query).await
    }

    /// Get the number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions that have been inactive longer than the timeout.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = self.write();
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired_with_timeout(timeout));
        before - guard.len()
    }

    fn new_widget(&self) -> ChatWidget {
        ChatWidget::new(
            Arc::clone(&self.inner.backend),
            self.inner.settings.clone(),
        )
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Session>> {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
