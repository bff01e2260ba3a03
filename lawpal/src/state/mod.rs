//! Conversation & session state owned by one authenticated user.
//!
//! Both containers are plain data with update functions; callers serialize
//! access (the chat orchestrator holds them behind async locks).

mod notifications;
mod store;

pub use notifications::NotificationQueue;
pub use store::{Action, ConversationStore, Outcome, StoreError};
