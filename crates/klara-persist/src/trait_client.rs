use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Conversation, Exchange, StoredMessage};

/// Trait for conversation/message persistence operations.
///
/// Implementations provide database-specific CRUD; the chat core only
/// depends on this trait so tests can substitute an in-memory double.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Fetch a conversation by id, or `None` when it does not exist.
    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>>;

    /// Create a conversation for `user_id` with the given title.
    async fn create_conversation(&self, user_id: &str, title: &str) -> Result<Conversation>;

    /// Append a user/assistant message pair and update the conversation's
    /// last-activity time, last-message preview and message count, as one
    /// logical operation from the caller's perspective.
    async fn append_exchange(&self, conversation_id: &str, exchange: Exchange) -> Result<()>;

    /// Set the conversation title, but only while it still carries the
    /// default title.
    async fn set_title_if_default(&self, conversation_id: &str, title: &str) -> Result<()>;

    /// The most recent `limit` messages of a conversation, in
    /// chronological order.
    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: i64,
    ) -> Result<Vec<StoredMessage>>;

    /// A user's conversations, most recently active first.
    async fn list_conversations(&self, user_id: &str, limit: i64) -> Result<Vec<Conversation>>;
}
