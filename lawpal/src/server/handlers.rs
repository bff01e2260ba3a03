//! Request handlers for the authenticated API.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Query, Request, State,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::chat::{ChatError, ChatOrchestrator, QueryResponse, Submission};
use crate::config::{Settings, SettingsPatch};
use crate::models::{Conversation, ConversationId, Message, Notification, NotificationId, Session};
use crate::state::StoreError;

use super::ServerState;

// === Errors ===

/// Error returned by API handlers, rendered as `{ "message": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("clearing a conversation requires confirm=true")]
    ConfirmationRequired,
    #[error("{0}")]
    InvalidRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Chat(ChatError::Store(StoreError::NotFound(_))) => StatusCode::NOT_FOUND,
            Self::Chat(ChatError::EmptyQuery) | Self::ConfirmationRequired | Self::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Chat(ChatError::Busy(_)) => StatusCode::CONFLICT,
            Self::Chat(ChatError::Interrupted) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "message": self.to_string() }))).into_response()
    }
}

// === Extractors ===

/// `Json` whose rejection is rendered as an [`ApiError`].
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// `Path` whose rejection is rendered as an [`ApiError`].
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
pub struct QueryBody {
    pub query: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationList {
    pub active_id: ConversationId,
    pub conversations: Vec<ConversationView>,
}

/// Wire shape of a conversation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationView {
    pub id: ConversationId,
    pub title: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub messages: Vec<Message>,
    /// A submission is in flight; clients should not resubmit.
    #[serde(default)]
    pub awaiting_response: bool,
}

impl ConversationView {
    fn new(c: Conversation, chat: &ChatOrchestrator) -> Self {
        let messages = c.messages().to_vec();
        Self {
            id: c.id,
            awaiting_response: chat.is_awaiting(c.id),
            title: c.title,
            created_at: c.created_at,
            messages,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClearParams {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteLastResponse {
    pub removed: usize,
    pub conversation: ConversationView,
}

async fn view(chat: &ChatOrchestrator, id: ConversationId) -> Result<ConversationView, ApiError> {
    Ok(ConversationView::new(chat.conversation(id).await?, chat))
}

// === Handlers ===

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Forward a bare query to the answer service, bypassing conversation state.
///
/// A missing or unreadable body counts as a missing query.
pub async fn forward_query(
    State(state): State<Arc<ServerState>>,
    Extension(session): Extension<Session>,
    body: Result<Json<QueryBody>, JsonRejection>,
) -> Response {
    let query = body.ok().and_then(|Json(body)| body.query);
    let Some(query) = query.filter(|q| !q.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Query not provided" })),
        )
            .into_response();
    };

    tracing::info!(user_id = %session.user_id, "forwarding query");
    match state.answers.answer(&query).await {
        Ok(answer) => Json(QueryResponse { answer }).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "answer service call failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "Failed to get response from AI model. Is the AI server running?"
                })),
            )
                .into_response()
        }
    }
}

pub async fn list_conversations(
    State(state): State<Arc<ServerState>>,
    Extension(session): Extension<Session>,
) -> Json<ConversationList> {
    let workspace = state.workspace(&session.user_id).await;
    let (active_id, conversations) = workspace.chat.conversations().await;
    Json(ConversationList {
        active_id,
        conversations: conversations
            .into_iter()
            .map(|c| ConversationView::new(c, &workspace.chat))
            .collect(),
    })
}

pub async fn create_conversation(
    State(state): State<Arc<ServerState>>,
    Extension(session): Extension<Session>,
) -> (StatusCode, Json<ConversationView>) {
    let workspace = state.workspace(&session.user_id).await;
    let conversation = workspace.chat.create_conversation().await;
    tracing::info!(user_id = %session.user_id, conversation = %conversation.id, "conversation created");
    (
        StatusCode::CREATED,
        Json(ConversationView::new(conversation, &workspace.chat)),
    )
}

pub async fn get_conversation(
    State(state): State<Arc<ServerState>>,
    Extension(session): Extension<Session>,
    ApiPath(id): ApiPath<ConversationId>,
) -> Result<Json<ConversationView>, ApiError> {
    let workspace = state.workspace(&session.user_id).await;
    Ok(Json(view(&workspace.chat, id).await?))
}

pub async fn rename_conversation(
    State(state): State<Arc<ServerState>>,
    Extension(session): Extension<Session>,
    ApiPath(id): ApiPath<ConversationId>,
    ApiJson(req): ApiJson<RenameRequest>,
) -> Result<Json<ConversationView>, ApiError> {
    let workspace = state.workspace(&session.user_id).await;
    workspace.chat.rename_conversation(id, req.title).await?;
    Ok(Json(view(&workspace.chat, id).await?))
}

pub async fn select_conversation(
    State(state): State<Arc<ServerState>>,
    Extension(session): Extension<Session>,
    ApiPath(id): ApiPath<ConversationId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let workspace = state.workspace(&session.user_id).await;
    workspace.chat.select_conversation(id).await?;
    Ok(Json(serde_json::json!({ "active_id": id })))
}

pub async fn clear_conversation(
    State(state): State<Arc<ServerState>>,
    Extension(session): Extension<Session>,
    ApiPath(id): ApiPath<ConversationId>,
    Query(params): Query<ClearParams>,
) -> Result<Json<ConversationView>, ApiError> {
    if !params.confirm {
        return Err(ApiError::ConfirmationRequired);
    }
    let workspace = state.workspace(&session.user_id).await;
    workspace.chat.clear_conversation(id).await?;
    Ok(Json(view(&workspace.chat, id).await?))
}

pub async fn delete_last_exchange(
    State(state): State<Arc<ServerState>>,
    Extension(session): Extension<Session>,
    ApiPath(id): ApiPath<ConversationId>,
) -> Result<Json<DeleteLastResponse>, ApiError> {
    let workspace = state.workspace(&session.user_id).await;
    let removed = workspace.chat.delete_last_exchange(id).await?;
    Ok(Json(DeleteLastResponse {
        removed,
        conversation: view(&workspace.chat, id).await?,
    }))
}

pub async fn submit(
    State(state): State<Arc<ServerState>>,
    Extension(session): Extension<Session>,
    ApiJson(body): ApiJson<QueryBody>,
) -> Result<Json<Submission>, ApiError> {
    let workspace = state.workspace(&session.user_id).await;
    let query = body.query.unwrap_or_default();
    Ok(Json(workspace.chat.submit(&query).await?))
}

pub async fn list_notifications(
    State(state): State<Arc<ServerState>>,
    Extension(session): Extension<Session>,
) -> Json<Vec<Notification>> {
    let workspace = state.workspace(&session.user_id).await;
    Json(workspace.chat.notifications().await)
}

pub async fn dismiss_notification(
    State(state): State<Arc<ServerState>>,
    Extension(session): Extension<Session>,
    ApiPath(id): ApiPath<NotificationId>,
) -> Result<StatusCode, ApiError> {
    let workspace = state.workspace(&session.user_id).await;
    workspace.chat.dismiss_notification(id).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_settings(
    State(state): State<Arc<ServerState>>,
    Extension(session): Extension<Session>,
) -> Json<Settings> {
    let workspace = state.workspace(&session.user_id).await;
    let settings = workspace.settings.read().await.clone();
    Json(settings)
}

pub async fn update_settings(
    State(state): State<Arc<ServerState>>,
    Extension(session): Extension<Session>,
    ApiJson(patch): ApiJson<SettingsPatch>,
) -> Json<Settings> {
    let workspace = state.workspace(&session.user_id).await;
    let mut settings = workspace.settings.write().await;
    settings.apply(patch);
    Json(settings.clone())
}
