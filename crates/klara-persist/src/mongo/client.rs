use async_trait::async_trait;
use bson::oid::ObjectId;
use mongodb::Client;

use klara_types::truncate_chars;

use crate::error::{PersistError, Result};
use crate::models::{Conversation, Exchange, Sender, StoredMessage};
use crate::mongo::repositories::{ConversationRepository, MessageRepository};
use crate::trait_client::ConversationStore;

/// Number of characters of the latest message kept on the conversation
/// document as a preview.
const LAST_MESSAGE_PREVIEW_CHARS: usize = 100;

pub struct MongoConversationStore {
    conversations: ConversationRepository,
    messages: MessageRepository,
}

impl MongoConversationStore {
    /// Connect to MongoDB and create the store
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        Ok(Self {
            conversations: ConversationRepository::new(&client, database),
            messages: MessageRepository::new(&client, database),
        })
    }

    fn parse_id(conversation_id: &str) -> Result<ObjectId> {
        ObjectId::parse_str(conversation_id)
            .map_err(|e| PersistError::InvalidObjectId(e.to_string()))
    }
}

#[async_trait]
impl ConversationStore for MongoConversationStore {
    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        let object_id = Self::parse_id(conversation_id)?;
        self.conversations.get(object_id).await
    }

    async fn create_conversation(&self, user_id: &str, title: &str) -> Result<Conversation> {
        self.conversations
            .create(user_id.to_string(), title.to_string())
            .await
    }

    async fn append_exchange(&self, conversation_id: &str, exchange: Exchange) -> Result<()> {
        let object_id = Self::parse_id(conversation_id)?;

        let user_message = StoredMessage {
            id: ObjectId::new(),
            conversation_id: object_id,
            sender: Sender::User,
            text: exchange.user_text,
            created_at: exchange.asked_at,
            sources: None,
            follow_up_questions: None,
            streaming: false,
        };
        let assistant_message = StoredMessage {
            id: ObjectId::new(),
            conversation_id: object_id,
            sender: Sender::Ai,
            text: exchange.assistant_text.clone(),
            created_at: exchange.answered_at,
            sources: (!exchange.sources.is_empty()).then_some(exchange.sources),
            follow_up_questions: (!exchange.follow_up_questions.is_empty())
                .then_some(exchange.follow_up_questions),
            streaming: false,
        };

        self.messages
            .append(vec![user_message, assistant_message])
            .await?;

        let preview = truncate_chars(&exchange.assistant_text, LAST_MESSAGE_PREVIEW_CHARS);
        self.conversations
            .record_exchange(object_id, &preview, 2)
            .await
    }

    async fn set_title_if_default(&self, conversation_id: &str, title: &str) -> Result<()> {
        let object_id = Self::parse_id(conversation_id)?;
        self.conversations
            .set_title_if_default(object_id, title)
            .await
    }

    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: i64,
    ) -> Result<Vec<StoredMessage>> {
        let object_id = Self::parse_id(conversation_id)?;
        self.messages.recent(object_id, limit).await
    }

    async fn list_conversations(&self, user_id: &str, limit: i64) -> Result<Vec<Conversation>> {
        self.conversations.list_for_user(user_id, limit).await
    }
}
