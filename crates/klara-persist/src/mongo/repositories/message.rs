use bson::oid::ObjectId;
use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection};

use crate::error::Result;
use crate::models::StoredMessage;

#[derive(Clone)]
pub struct MessageRepository {
    collection: Collection<StoredMessage>,
}

impl MessageRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("messages");
        Self { collection }
    }

    /// Append a batch of messages
    pub async fn append(&self, messages: Vec<StoredMessage>) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        self.collection.insert_many(messages).await?;
        Ok(())
    }

    /// The most recent `limit` messages, returned in chronological order
    pub async fn recent(&self, conversation_id: ObjectId, limit: i64) -> Result<Vec<StoredMessage>> {
        let filter = doc! { "conversation_id": conversation_id };
        let mut messages: Vec<StoredMessage> = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        messages.reverse();
        Ok(messages)
    }
}
