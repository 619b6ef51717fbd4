use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use klara_types::Source;

/// Title given to a conversation before its first user message names it.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";

/// A persisted chat thread owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: String,
    pub title: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub last_activity: DateTime<Utc>,
    /// First 100 characters of the most recent message.
    pub last_message: String,
    pub message_count: i64,
}

/// One persisted message. Append-only; owned by its conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub conversation_id: ObjectId,
    pub sender: Sender,
    pub text: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_questions: Option<Vec<String>>,
    #[serde(default)]
    pub streaming: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// A user question and its assistant answer, appended together.
///
/// `asked_at` is deliberately a few milliseconds before `answered_at` so
/// timestamp ordering always places the question first.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub user_text: String,
    pub assistant_text: String,
    pub sources: Vec<Source>,
    pub follow_up_questions: Vec<String>,
    pub asked_at: DateTime<Utc>,
    pub answered_at: DateTime<Utc>,
}

impl Exchange {
    /// Build an exchange stamped at `answered_at = now`, with the user
    /// message offset 5ms earlier.
    pub fn now(
        user_text: impl Into<String>,
        assistant_text: impl Into<String>,
        sources: Vec<Source>,
        follow_up_questions: Vec<String>,
    ) -> Self {
        let answered_at = Utc::now();
        Self {
            user_text: user_text.into(),
            assistant_text: assistant_text.into(),
            sources,
            follow_up_questions,
            asked_at: answered_at - chrono::Duration::milliseconds(5),
            answered_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_orders_question_before_answer() {
        let exchange = Exchange::now("q", "a", vec![], vec![]);
        assert!(exchange.asked_at < exchange.answered_at);
        let delta = exchange.answered_at - exchange.asked_at;
        assert_eq!(delta.num_milliseconds(), 5);
    }

    #[test]
    fn sender_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Sender::User).unwrap(), "user");
        assert_eq!(serde_json::to_value(Sender::Ai).unwrap(), "ai");
    }
}
