use bson::oid::ObjectId;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection};

use crate::error::Result;
use crate::models::{Conversation, DEFAULT_CONVERSATION_TITLE};

#[derive(Clone)]
pub struct ConversationRepository {
    collection: Collection<Conversation>,
}

impl ConversationRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("conversations");
        Self { collection }
    }

    /// Create a new conversation
    pub async fn create(&self, user_id: String, title: String) -> Result<Conversation> {
        let now = Utc::now();
        let conversation = Conversation {
            id: ObjectId::new(),
            user_id,
            title,
            created_at: now,
            last_activity: now,
            last_message: String::new(),
            message_count: 0,
        };

        self.collection.insert_one(&conversation).await?;
        Ok(conversation)
    }

    /// Get conversation by ID
    pub async fn get(&self, conversation_id: ObjectId) -> Result<Option<Conversation>> {
        let filter = doc! { "_id": conversation_id };
        Ok(self.collection.find_one(filter).await?)
    }

    /// List conversations for a user, most recently active first
    pub async fn list_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<Conversation>> {
        let filter = doc! { "user_id": user_id };
        let conversations = self
            .collection
            .find(filter)
            .sort(doc! { "last_activity": -1 })
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        Ok(conversations)
    }

    /// Record appended messages: bump activity, preview and count
    pub async fn record_exchange(
        &self,
        conversation_id: ObjectId,
        last_message: &str,
        appended: i64,
    ) -> Result<()> {
        let filter = doc! { "_id": conversation_id };
        let update = doc! {
            "$set": {
                "last_activity": bson::DateTime::now(),
                "last_message": last_message,
            },
            "$inc": { "message_count": appended },
        };
        self.collection.update_one(filter, update).await?;
        Ok(())
    }

    /// Set the title only while it is still the default
    pub async fn set_title_if_default(&self, conversation_id: ObjectId, title: &str) -> Result<()> {
        let filter = doc! {
            "_id": conversation_id,
            "title": DEFAULT_CONVERSATION_TITLE,
        };
        let update = doc! { "$set": { "title": title } };
        self.collection.update_one(filter, update).await?;
        Ok(())
    }
}
