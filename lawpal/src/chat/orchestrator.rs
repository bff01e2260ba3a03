//! Chat orchestrator: routes UI actions into the conversation store, runs
//! query submissions against the answer source, and raises notifications.
//!
//! Each conversation is either idle or awaiting a response. A submission
//! moves the active conversation to awaiting, calls the answer source
//! without holding any store lock, records the exchange, and always returns
//! it to idle, whether the call succeeded or not.
//!
//! The cycle runs on its own task, so dropping the caller's future (a
//! client hanging up, say) never loses the exchange.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{
    Conversation, ConversationId, Message, Notification, NotificationId, Severity,
};
use crate::state::{Action, ConversationStore, NotificationQueue, Outcome, StoreError};

use super::upstream::AnswerSource;

/// Assistant reply recorded when the answer source fails.
pub const FAILURE_REPLY: &str = "Failed to get response. Is the backend server running?";

/// Errors reported to the caller of an orchestrator operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("query is empty")]
    EmptyQuery,
    #[error("conversation {0} is already awaiting a response")]
    Busy(ConversationId),
    #[error("submission task stopped before recording the exchange")]
    Interrupted,
}

/// A completed submission cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub conversation_id: ConversationId,
    pub query: Message,
    pub reply: Message,
    /// True when `reply` is the synthetic failure notice.
    pub failed: bool,
}

type AwaitingSet = Arc<Mutex<HashSet<ConversationId>>>;

/// Marks a conversation as awaiting a response for as long as it lives.
struct AwaitingGuard {
    awaiting: AwaitingSet,
    id: ConversationId,
}

impl Drop for AwaitingGuard {
    fn drop(&mut self) {
        self.awaiting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Owns one user's conversation store and notification queue.
pub struct ChatOrchestrator {
    store: Arc<RwLock<ConversationStore>>,
    notifications: NotificationQueue,
    answers: Arc<dyn AnswerSource>,
    awaiting: AwaitingSet,
}

impl ChatOrchestrator {
    pub fn new(answers: Arc<dyn AnswerSource>) -> Self {
        Self::with_notifications(answers, NotificationQueue::new())
    }

    pub fn with_notifications(answers: Arc<dyn AnswerSource>, notifications: NotificationQueue) -> Self {
        Self {
            store: Arc::new(RwLock::new(ConversationStore::new())),
            notifications,
            answers,
            awaiting: Arc::default(),
        }
    }

    async fn dispatch(&self, action: Action) -> Result<Outcome, StoreError> {
        self.store.write().await.apply(action)
    }

    // === Conversation actions ===

    pub async fn create_conversation(&self) -> Conversation {
        let conversation = {
            let mut store = self.store.write().await;
            store.create_conversation();
            store.active().clone()
        };
        self.notifications
            .notify("New conversation created", Severity::Success)
            .await;
        conversation
    }

    pub async fn rename_conversation(&self, id: ConversationId, title: String) -> Result<(), ChatError> {
        self.dispatch(Action::Rename { id, title }).await?;
        self.notifications
            .notify("Conversation renamed successfully", Severity::Success)
            .await;
        Ok(())
    }

    pub async fn select_conversation(&self, id: ConversationId) -> Result<(), ChatError> {
        self.dispatch(Action::Select { id }).await?;
        Ok(())
    }

    /// Truncate a conversation to its seed. The caller must have obtained
    /// the user's confirmation first.
    pub async fn clear_conversation(&self, id: ConversationId) -> Result<(), ChatError> {
        self.dispatch(Action::Clear { id }).await?;
        self.notifications.notify("Chat cleared", Severity::Info).await;
        Ok(())
    }

    /// Remove the last exchange; returns the number of messages removed.
    pub async fn delete_last_exchange(&self, id: ConversationId) -> Result<usize, ChatError> {
        let removed = self.store.write().await.delete_last_exchange(id)?;
        if removed > 0 {
            self.notifications
                .notify("Last message deleted", Severity::Info)
                .await;
        }
        Ok(removed)
    }

    // === Submission ===

    /// Send `query` to the answer source on behalf of the active conversation.
    ///
    /// Failures of the answer source are contained: a synthetic assistant
    /// reply is recorded and an error notification is raised.
    pub async fn submit(&self, query: &str) -> Result<Submission, ChatError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ChatError::EmptyQuery);
        }

        let id = self.store.read().await.active_id();
        let awaiting = self.begin_awaiting(id)?;
        tracing::debug!(conversation = %id, "awaiting response");

        let cycle = SubmissionCycle {
            store: Arc::clone(&self.store),
            notifications: self.notifications.clone(),
            answers: Arc::clone(&self.answers),
            query: Message::user(query),
            awaiting,
        };
        tokio::spawn(cycle.run()).await.map_err(|err| {
            tracing::error!(conversation = %id, error = %err, "submission task failed");
            ChatError::Interrupted
        })?
    }

    fn begin_awaiting(&self, id: ConversationId) -> Result<AwaitingGuard, ChatError> {
        let mut awaiting = self.awaiting.lock().unwrap_or_else(PoisonError::into_inner);
        if !awaiting.insert(id) {
            return Err(ChatError::Busy(id));
        }
        Ok(AwaitingGuard {
            awaiting: Arc::clone(&self.awaiting),
            id,
        })
    }

    pub fn is_awaiting(&self, id: ConversationId) -> bool {
        self.awaiting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }

    // === Reads ===

    /// Active id plus every conversation, newest first.
    pub async fn conversations(&self) -> (ConversationId, Vec<Conversation>) {
        let store = self.store.read().await;
        (store.active_id(), store.list().into_iter().cloned().collect())
    }

    pub async fn conversation(&self, id: ConversationId) -> Result<Conversation, ChatError> {
        Ok(self.store.read().await.get(id)?.clone())
    }

    // === Notifications ===

    pub async fn notifications(&self) -> Vec<Notification> {
        self.notifications.list().await
    }

    pub async fn dismiss_notification(&self, id: NotificationId) {
        self.notifications.dismiss(id).await;
    }
}

/// One submission, owned outright so it can outlive the request that
/// started it. The conversation leaves the awaiting state when this drops.
struct SubmissionCycle {
    store: Arc<RwLock<ConversationStore>>,
    notifications: NotificationQueue,
    answers: Arc<dyn AnswerSource>,
    query: Message,
    awaiting: AwaitingGuard,
}

impl SubmissionCycle {
    async fn run(self) -> Result<Submission, ChatError> {
        let id = self.awaiting.id;
        let (reply, failed) = match self.answers.answer(&self.query.content).await {
            Ok(answer) => (Message::assistant(answer), false),
            Err(err) => {
                tracing::warn!(conversation = %id, error = %err, "answer service failed");
                (Message::assistant(FAILURE_REPLY), true)
            }
        };

        {
            let mut store = self.store.write().await;
            // Both turns land under one lock so no reader sees half an exchange.
            store.apply(Action::Append { id, message: self.query.clone() })?;
            store.apply(Action::Append { id, message: reply.clone() })?;
        }

        if failed {
            self.notifications
                .notify("Failed to get response from AI model", Severity::Error)
                .await;
        }

        Ok(Submission {
            conversation_id: id,
            query: self.query,
            reply,
            failed,
        })
    }
}
