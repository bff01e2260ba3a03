//! Lawpal server - authenticated chat API in front of an external answer service.
//!
//! Architecture:
//! - Every route except `/health` passes the bearer-token gate first
//! - Each authenticated user id gets its own workspace (conversations,
//!   notifications, settings), created on first use and kept in memory
//! - Answers come from a single shared answer source
//!
//! Endpoints:
//! - GET /health - Liveness check (unauthenticated)
//! - POST /api/query - Forward a bare query to the answer service
//! - GET/POST /api/conversations - List / create conversations
//! - GET/PATCH /api/conversations/{id} - Fetch / rename a conversation
//! - POST /api/conversations/{id}/select - Make a conversation active
//! - DELETE /api/conversations/{id}/messages?confirm=true - Clear a conversation
//! - DELETE /api/conversations/{id}/messages/last - Delete the last exchange
//! - POST /api/chat - Submit a query to the active conversation
//! - GET /api/notifications, DELETE /api/notifications/{id} - Notification queue
//! - GET/PATCH /api/settings - Per-user settings

mod handlers;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{require_auth, TokenVerifier};
use crate::chat::{AnswerSource, ChatOrchestrator, UpstreamClient};
use crate::config::{ServerConfig, Settings};

pub use handlers::{ConversationList, ConversationView};

/// Everything one user owns.
pub struct Workspace {
    pub chat: ChatOrchestrator,
    pub settings: RwLock<Settings>,
}

impl Workspace {
    fn new(answers: Arc<dyn AnswerSource>) -> Self {
        Self {
            chat: ChatOrchestrator::new(answers),
            settings: RwLock::new(Settings::default()),
        }
    }
}

/// Workspace manager - one workspace per user id.
#[derive(Default)]
pub struct WorkspaceManager {
    workspaces: HashMap<String, Arc<Workspace>>,
}

impl WorkspaceManager {
    pub fn get(&self, user_id: &str) -> Option<Arc<Workspace>> {
        self.workspaces.get(user_id).cloned()
    }

    /// Get or create the workspace for a user.
    pub fn get_or_create(&mut self, user_id: &str, answers: &Arc<dyn AnswerSource>) -> Arc<Workspace> {
        self.workspaces
            .entry(user_id.to_string())
            .or_insert_with(|| {
                tracing::info!(%user_id, "creating workspace");
                Arc::new(Workspace::new(answers.clone()))
            })
            .clone()
    }
}

/// Shared server state.
pub struct ServerState {
    verifier: Arc<TokenVerifier>,
    answers: Arc<dyn AnswerSource>,
    workspaces: RwLock<WorkspaceManager>,
}

impl ServerState {
    pub fn new(verifier: TokenVerifier, answers: Arc<dyn AnswerSource>) -> Self {
        Self {
            verifier: Arc::new(verifier),
            answers,
            workspaces: RwLock::new(WorkspaceManager::default()),
        }
    }

    /// Workspace of `user_id`, creating it on first access.
    pub async fn workspace(&self, user_id: &str) -> Arc<Workspace> {
        if let Some(workspace) = self.workspaces.read().await.get(user_id) {
            return workspace;
        }
        self.workspaces
            .write()
            .await
            .get_or_create(user_id, &self.answers)
    }
}

/// Build the application router.
pub fn router(state: Arc<ServerState>) -> Router {
    let protected = Router::new()
        .route("/api/query", post(handlers::forward_query))
        .route(
            "/api/conversations",
            get(handlers::list_conversations).post(handlers::create_conversation),
        )
        .route(
            "/api/conversations/{id}",
            get(handlers::get_conversation).patch(handlers::rename_conversation),
        )
        .route("/api/conversations/{id}/select", post(handlers::select_conversation))
        .route("/api/conversations/{id}/messages", delete(handlers::clear_conversation))
        .route(
            "/api/conversations/{id}/messages/last",
            delete(handlers::delete_last_exchange),
        )
        .route("/api/chat", post(handlers::submit))
        .route("/api/notifications", get(handlers::list_notifications))
        .route("/api/notifications/{id}", delete(handlers::dismiss_notification))
        .route(
            "/api/settings",
            get(handlers::get_settings).patch(handlers::update_settings),
        )
        .route_layer(middleware::from_fn_with_state(
            state.verifier.clone(),
            require_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === Server Lifecycle ===

/// Start the server and run until Ctrl-C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let answers = UpstreamClient::new(&config.upstream_url, config.upstream_timeout)
        .context("Failed to build answer service client")?;
    let state = Arc::new(ServerState::new(
        TokenVerifier::new(&config.jwt_secret),
        Arc::new(answers),
    ));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!(
        %addr,
        upstream = %config.upstream_url,
        timeout_secs = config.upstream_timeout.as_secs(),
        "lawpal server starting"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("lawpal server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
