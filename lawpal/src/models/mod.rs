//! Data models for conversations, notifications and sessions.

mod conversation;
mod message;
mod notification;
mod session;

pub use conversation::{Conversation, ConversationId, SEED_GREETING};
pub use message::Message;
pub use notification::{Notification, NotificationId, Severity};
pub use session::Session;
