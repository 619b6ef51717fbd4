use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use klara_persist::{Conversation, Sender, StoredMessage};
use klara_types::Source;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub conversation_id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_activity: chrono::DateTime<chrono::Utc>,
    pub last_message: String,
    pub message_count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConversationsQuery {
    pub user_id: String,
    #[serde(default = "default_conversation_limit")]
    pub limit: i64,
}

fn default_conversation_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct ListConversationsResponse {
    pub conversations: Vec<ConversationResponse>,
    pub has_more: bool,
}

/// List a user's conversations, most recently active first.
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListConversationsQuery>,
) -> ApiResult<Json<ListConversationsResponse>> {
    let limit = query.limit.clamp(1, 100);

    let conversations = state.store.list_conversations(&query.user_id, limit).await?;

    let has_more = conversations.len() as i64 == limit;
    let conversations: Vec<ConversationResponse> = conversations
        .into_iter()
        .map(conversation_to_response)
        .collect();

    Ok(Json(ListConversationsResponse {
        conversations,
        has_more,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message_id: String,
    pub sender: Sender,
    pub text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_questions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesQuery {
    pub user_id: String,
    #[serde(default = "default_message_limit")]
    pub limit: i64,
}

fn default_message_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct ListMessagesResponse {
    pub messages: Vec<MessageResponse>,
}

/// List the most recent messages of a conversation, oldest first.
///
/// The conversation must belong to the requesting user.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Query(query): Query<ListMessagesQuery>,
) -> ApiResult<Json<ListMessagesResponse>> {
    let limit = query.limit.clamp(1, 200);

    let conversation = state
        .store
        .get_conversation(&conversation_id)
        .await?
        .ok_or_else(|| ApiError::ConversationNotFound(conversation_id.clone()))?;

    if conversation.user_id != query.user_id {
        return Err(ApiError::Forbidden(
            "conversation does not belong to this user".to_string(),
        ));
    }

    let messages = state.store.recent_messages(&conversation_id, limit).await?;

    Ok(Json(ListMessagesResponse {
        messages: messages.into_iter().map(message_to_response).collect(),
    }))
}

fn conversation_to_response(conversation: Conversation) -> ConversationResponse {
    ConversationResponse {
        conversation_id: conversation.id.to_hex(),
        user_id: conversation.user_id,
        title: conversation.title,
        created_at: conversation.created_at,
        last_activity: conversation.last_activity,
        last_message: conversation.last_message,
        message_count: conversation.message_count,
    }
}

fn message_to_response(message: StoredMessage) -> MessageResponse {
    MessageResponse {
        message_id: message.id.to_hex(),
        sender: message.sender,
        text: message.text,
        created_at: message.created_at,
        sources: message.sources,
        follow_up_questions: message.follow_up_questions,
    }
}
