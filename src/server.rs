use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::session::SessionStore;
use crate::shop::{HttpShopClient, ShopBackend};
use crate::widget::{Message, render};

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let backend: Arc<dyn ShopBackend> = Arc::new(HttpShopClient::from_config(&config.shop)?);

    info!(
        name: "shop.config.loaded",
        lookup_url = %config.shop.lookup_url,
        cart_url = %config.shop.cart_url,
        "Shop endpoints configured"
    );

    let sessions = SessionStore::new(backend, config.widget.clone());
    let _sweeper = spawn_session_sweeper(sessions.clone(), &config);

    let state = AppState {
        sessions,
        config: Arc::clone(&config),
    };
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();

    Router::new()
        .route("/", get(index_handler))
        .route("/chat/send", post(send_handler))
        .route("/chat/cart", post(cart_handler))
        .route("/chat/suggestions", get(suggestions_handler))
        .route("/api/sessions/{id}/messages", get(api_get_messages))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Periodically drop sessions idle longer than the configured timeout.
pub fn spawn_session_sweeper(sessions: SessionStore, config: &AppConfig) -> JoinHandle<()> {
    let idle = config.session.idle_timeout();
    let period = config.session.sweep_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = sessions.cleanup_expired_with_timeout(idle);
            if removed > 0 {
                info!(
                    name: "session.swept",
                    removed = removed,
                    remaining = sessions.len(),
                    "Expired sessions removed"
                );
            }
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - Widget page for a fresh session.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let session = state.sessions.create();
    tracing::debug!(session_id = %session.id(), "Session opened");
    Html(render::page(
        session.id(),
        &session.widget().messages(),
        &state.sessions.settings().currency_symbol,
    ))
}

/// Form body of the send action.
#[derive(Debug, Deserialize)]
struct SendForm {
    #[serde(default)]
    session_id: String,
    #[serde(default)]
    message: String,
}

/// POST /chat/send - Bubbles appended by one send (empty for blank input).
async fn send_handler(State(state): State<AppState>, Form(form): Form<SendForm>) -> Html<String> {
    let session = state.sessions.resolve(&form.session_id);
    let appended = session.widget().send_message(&form.message).await;
    Html(session.widget().render_all(&appended))
}

/// Form body of the add-to-cart action.
#[derive(Debug, Deserialize)]
struct CartForm {
    #[serde(default)]
    session_id: String,
    product: String,
}

/// POST /chat/cart - Outcome bubble of an add-to-cart action.
async fn cart_handler(State(state): State<AppState>, Form(form): Form<CartForm>) -> Html<String> {
    let session = state.sessions.resolve(&form.session_id);
    let message = session.widget().add_to_cart(&form.product).await;
    Html(session.widget().render(&message))
}

/// Query of the suggestion lookup. The input field submits itself as
/// `message`.
#[derive(Debug, Deserialize)]
struct SuggestQuery {
    #[serde(default)]
    session_id: String,
    #[serde(default, alias = "message")]
    q: String,
}

/// GET /chat/suggestions - `<option>` list for the input's datalist.
///
/// Read-only: an unknown or blank session id does not create a session.
async fn suggestions_handler(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> Html<String> {
    let suggestions = match state.sessions.get(query.session_id.trim()) {
        Some(session) => session.widget().suggest(&query.q).await,
        None => state.sessions.suggest(&query.q).await,
    };
    Html(render::suggestion_options(&suggestions))
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/sessions/:id/messages - Chat log of a session.
async fn api_get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, StatusCode> {
    match state.sessions.get(&id) {
        Some(session) => Ok(Json(session.widget().messages())),
        None => Err(StatusCode::NOT_FOUND),
    }
}
