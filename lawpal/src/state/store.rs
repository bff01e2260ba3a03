//! Conversation store: the set of conversations plus the active pointer.
//!
//! All mutation goes through [`ConversationStore::apply`], which takes an
//! [`Action`] and either applies it fully or reports an error without
//! touching anything.

use thiserror::Error;

use crate::models::{Conversation, ConversationId, Message};

/// Errors reported by store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("conversation {0} not found")]
    NotFound(ConversationId),
}

/// A state-changing request against the store.
#[derive(Debug, Clone)]
pub enum Action {
    /// Replace a conversation's title verbatim.
    Rename { id: ConversationId, title: String },
    /// Append one message to a conversation.
    Append { id: ConversationId, message: Message },
    /// Truncate a conversation back to its seed message.
    Clear { id: ConversationId },
    /// Remove the most recent exchange (see [`ConversationStore::delete_last_exchange`]).
    DeleteLastExchange { id: ConversationId },
    /// Repoint the active conversation.
    Select { id: ConversationId },
}

/// What an applied action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Renamed,
    Appended,
    Cleared,
    /// Number of messages removed by a delete-last-exchange (0, 1 or 2).
    Deleted(usize),
    Selected,
}

/// Owns every conversation of one user and the active-conversation pointer.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    /// Kept in insertion order; [`Self::list`] sorts for display.
    conversations: Vec<Conversation>,
    active: ConversationId,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    /// A store holding a single seeded conversation, which is active.
    pub fn new() -> Self {
        let first = Conversation::seeded(default_title(1));
        let active = first.id;
        Self {
            conversations: vec![first],
            active,
        }
    }

    /// Apply an action. On error the store is left unchanged.
    pub fn apply(&mut self, action: Action) -> Result<Outcome, StoreError> {
        match action {
            Action::Rename { id, title } => {
                self.rename_conversation(id, title)?;
                Ok(Outcome::Renamed)
            }
            Action::Append { id, message } => {
                self.append_message(id, message)?;
                Ok(Outcome::Appended)
            }
            Action::Clear { id } => {
                self.clear_conversation(id)?;
                Ok(Outcome::Cleared)
            }
            Action::DeleteLastExchange { id } => self.delete_last_exchange(id).map(Outcome::Deleted),
            Action::Select { id } => {
                self.set_active(id)?;
                Ok(Outcome::Selected)
            }
        }
    }

    pub fn create_conversation(&mut self) -> ConversationId {
        let conversation = Conversation::seeded(default_title(self.conversations.len() + 1));
        let id = conversation.id;
        self.conversations.push(conversation);
        self.active = id;
        id
    }

    pub fn rename_conversation(
        &mut self,
        id: ConversationId,
        title: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.get_mut(id)?.title = title.into();
        Ok(())
    }

    pub fn append_message(&mut self, id: ConversationId, message: Message) -> Result<(), StoreError> {
        self.get_mut(id)?.push(message);
        Ok(())
    }

    /// Truncate to the seed message. Confirmation is the caller's job.
    pub fn clear_conversation(&mut self, id: ConversationId) -> Result<(), StoreError> {
        self.get_mut(id)?.reset();
        Ok(())
    }

    /// Remove the trailing exchange and return how many messages went.
    ///
    /// A lone seed is left alone. A trailing assistant reply is removed
    /// together with the user turn before it; a trailing user turn that
    /// never got a reply is removed on its own.
    pub fn delete_last_exchange(&mut self, id: ConversationId) -> Result<usize, StoreError> {
        let conversation = self.get_mut(id)?;
        if conversation.messages().len() <= 1 {
            return Ok(0);
        }
        let count = match conversation.last_message() {
            Some(last) if last.is_assistant() => 2,
            _ => 1,
        };
        Ok(conversation.pop_tail(count))
    }

    /// Repoint the active conversation; unknown ids leave it unchanged.
    pub fn set_active(&mut self, id: ConversationId) -> Result<(), StoreError> {
        self.get(id)?;
        self.active = id;
        Ok(())
    }

    pub const fn active_id(&self) -> ConversationId {
        self.active
    }

    pub fn active(&self) -> &Conversation {
        // The pointer only ever holds ids that exist, and nothing removes conversations.
        self.conversations
            .iter()
            .find(|c| c.id == self.active)
            .unwrap_or(&self.conversations[0])
    }

    pub fn get(&self, id: ConversationId) -> Result<&Conversation, StoreError> {
        self.conversations
            .iter()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    fn get_mut(&mut self, id: ConversationId) -> Result<&mut Conversation, StoreError> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    /// Conversations for display, newest first.
    pub fn list(&self) -> Vec<&Conversation> {
        let mut all: Vec<&Conversation> = self.conversations.iter().collect();
        // Stable sort keeps insertion order for equal timestamps; reverse it so
        // the later-created one still comes first.
        all.reverse();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }
}

fn default_title(n: usize) -> String {
    format!("New Conversation {n}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SEED_GREETING;

    fn store_with(messages: &[Message]) -> (ConversationStore, ConversationId) {
        let mut store = ConversationStore::new();
        let id = store.active_id();
        for m in messages {
            store.append_message(id, m.clone()).unwrap();
        }
        (store, id)
    }

    fn contents(store: &ConversationStore, id: ConversationId) -> Vec<String> {
        store
            .get(id)
            .unwrap()
            .messages()
            .iter()
            .map(|m| m.content.clone())
            .collect()
    }

    #[test]
    fn new_store_has_one_active_seeded_conversation() {
        let store = ConversationStore::new();
        assert_eq!(store.list().len(), 1);
        let active = store.active();
        assert_eq!(active.title, "New Conversation 1");
        assert_eq!(active.messages(), &[Message::assistant(SEED_GREETING)]);
    }

    #[test]
    fn create_seeds_and_activates() {
        let mut store = ConversationStore::new();
        let first = store.active_id();
        let id = store.create_conversation();

        assert_ne!(id, first);
        assert_eq!(store.active_id(), id);
        let conv = store.get(id).unwrap();
        assert_eq!(conv.title, "New Conversation 2");
        assert_eq!(conv.messages().len(), 1);
        assert!(conv.messages()[0].is_assistant());
    }

    #[test]
    fn list_is_newest_first() {
        let mut store = ConversationStore::new();
        let first = store.active_id();
        let second = store.create_conversation();
        let third = store.create_conversation();

        let ids: Vec<_> = store.list().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![third, second, first]);
    }

    #[test]
    fn rename_stores_title_verbatim() {
        let mut store = ConversationStore::new();
        let a = store.active_id();
        let b = store.create_conversation();

        store.rename_conversation(a, "  Lease dispute ").unwrap();
        store.rename_conversation(b, "  Lease dispute ").unwrap();
        assert_eq!(store.get(a).unwrap().title, "  Lease dispute ");
        assert_eq!(store.get(b).unwrap().title, "  Lease dispute ");
    }

    #[test]
    fn operations_on_unknown_id_report_not_found() {
        let mut store = ConversationStore::new();
        let before = contents(&store, store.active_id());
        let ghost = ConversationId::generate();

        assert_eq!(store.rename_conversation(ghost, "x"), Err(StoreError::NotFound(ghost)));
        assert_eq!(
            store.append_message(ghost, Message::user("hi")),
            Err(StoreError::NotFound(ghost))
        );
        assert_eq!(store.clear_conversation(ghost), Err(StoreError::NotFound(ghost)));
        assert_eq!(store.delete_last_exchange(ghost), Err(StoreError::NotFound(ghost)));
        assert_eq!(store.list().len(), 1);
        assert_eq!(contents(&store, store.active_id()), before);
    }

    #[test]
    fn set_active_unknown_keeps_pointer() {
        let mut store = ConversationStore::new();
        let first = store.active_id();
        let second = store.create_conversation();

        let ghost = ConversationId::generate();
        assert_eq!(store.set_active(ghost), Err(StoreError::NotFound(ghost)));
        assert_eq!(store.active_id(), second);

        store.set_active(first).unwrap();
        assert_eq!(store.active_id(), first);
    }

    #[test]
    fn delete_removes_user_and_reply() {
        let (mut store, id) = store_with(&[Message::user("q1"), Message::assistant("a1")]);
        assert_eq!(store.delete_last_exchange(id), Ok(2));
        assert_eq!(contents(&store, id), vec![SEED_GREETING]);
    }

    #[test]
    fn delete_removes_unanswered_user_turn_only() {
        let (mut store, id) = store_with(&[
            Message::user("q1"),
            Message::assistant("a1"),
            Message::user("q2"),
        ]);
        assert_eq!(store.delete_last_exchange(id), Ok(1));
        assert_eq!(contents(&store, id), vec![SEED_GREETING, "q1", "a1"]);
    }

    #[test]
    fn delete_on_seed_only_is_noop() {
        let (mut store, id) = store_with(&[]);
        assert_eq!(store.delete_last_exchange(id), Ok(0));
        assert_eq!(contents(&store, id), vec![SEED_GREETING]);
    }

    #[test]
    fn delete_never_removes_seed() {
        // A lone assistant reply after the seed would pull the seed with it
        // under the pairing rule; the seed must survive.
        let (mut store, id) = store_with(&[Message::assistant("unprompted")]);
        assert_eq!(store.delete_last_exchange(id), Ok(1));
        assert_eq!(contents(&store, id), vec![SEED_GREETING]);
    }

    #[test]
    fn clear_restores_exactly_the_seed() {
        let (mut store, id) = store_with(&[
            Message::user("a"),
            Message::assistant("b"),
            Message::user("c"),
        ]);
        store.clear_conversation(id).unwrap();
        assert_eq!(contents(&store, id), vec![SEED_GREETING]);

        store.clear_conversation(id).unwrap();
        assert_eq!(contents(&store, id), vec![SEED_GREETING]);
    }

    #[test]
    fn apply_dispatches_actions() {
        let mut store = ConversationStore::new();
        let id = store.create_conversation();
        assert_eq!(store.apply(Action::Select { id }), Ok(Outcome::Selected));

        store
            .apply(Action::Append { id, message: Message::user("What is force majeure?") })
            .unwrap();
        store
            .apply(Action::Append { id, message: Message::assistant("An unforeseeable event...") })
            .unwrap();
        assert_eq!(store.get(id).unwrap().messages().len(), 3);

        assert_eq!(store.apply(Action::DeleteLastExchange { id }), Ok(Outcome::Deleted(2)));
        assert_eq!(
            store.apply(Action::Rename { id, title: "Contracts".into() }),
            Ok(Outcome::Renamed)
        );
        assert_eq!(store.get(id).unwrap().title, "Contracts");
    }

    #[test]
    fn every_conversation_keeps_its_seed() {
        let mut store = ConversationStore::new();
        let id = store.active_id();
        for i in 0..5 {
            store.append_message(id, Message::user(format!("q{i}"))).unwrap();
            if i % 2 == 0 {
                store.append_message(id, Message::assistant(format!("a{i}"))).unwrap();
            }
        }
        for _ in 0..10 {
            store.delete_last_exchange(id).unwrap();
            assert!(!store.get(id).unwrap().messages().is_empty());
        }
        assert_eq!(contents(&store, id), vec![SEED_GREETING]);
    }
}
