#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;

use klara_audit::{AuditEntry, AuditSink};
use klara_persist::{
    Conversation, ConversationStore, Exchange, PersistError, Sender, StoredMessage,
    DEFAULT_CONVERSATION_TITLE,
};
use klara_types::{truncate_chars, Source};
use klara_upstream::{AskOutcome, AskRequest, ChatBackend, ServedBy};

/// In-memory `ConversationStore` double mirroring the Mongo semantics.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    conversations: HashMap<String, Conversation>,
    messages: Vec<StoredMessage>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation(&self, id: &str) -> Option<Conversation> {
        self.state
            .lock()
            .unwrap()
            .conversations
            .get(id)
            .cloned()
    }

    pub fn messages_for(&self, id: &str) -> Vec<StoredMessage> {
        let object_id = ObjectId::parse_str(id).unwrap();
        let mut messages: Vec<StoredMessage> = self
            .state
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.conversation_id == object_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        messages
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> klara_persist::Result<Option<Conversation>> {
        ObjectId::parse_str(conversation_id)
            .map_err(|e| PersistError::InvalidObjectId(e.to_string()))?;
        Ok(self.conversation(conversation_id))
    }

    async fn create_conversation(
        &self,
        user_id: &str,
        title: &str,
    ) -> klara_persist::Result<Conversation> {
        let now = Utc::now();
        let conversation = Conversation {
            id: ObjectId::new(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: now,
            last_activity: now,
            last_message: String::new(),
            message_count: 0,
        };
        self.state
            .lock()
            .unwrap()
            .conversations
            .insert(conversation.id.to_hex(), conversation.clone());
        Ok(conversation)
    }

    async fn append_exchange(
        &self,
        conversation_id: &str,
        exchange: Exchange,
    ) -> klara_persist::Result<()> {
        let object_id = ObjectId::parse_str(conversation_id)
            .map_err(|e| PersistError::InvalidObjectId(e.to_string()))?;
        let mut state = self.state.lock().unwrap();

        state.messages.push(StoredMessage {
            id: ObjectId::new(),
            conversation_id: object_id,
            sender: Sender::User,
            text: exchange.user_text,
            created_at: exchange.asked_at,
            sources: None,
            follow_up_questions: None,
            streaming: false,
        });
        state.messages.push(StoredMessage {
            id: ObjectId::new(),
            conversation_id: object_id,
            sender: Sender::Ai,
            text: exchange.assistant_text.clone(),
            created_at: exchange.answered_at,
            sources: (!exchange.sources.is_empty()).then_some(exchange.sources),
            follow_up_questions: (!exchange.follow_up_questions.is_empty())
                .then_some(exchange.follow_up_questions),
            streaming: false,
        });

        let conversation = state
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| PersistError::ConversationNotFound(conversation_id.to_string()))?;
        conversation.last_activity = exchange.answered_at;
        conversation.last_message = truncate_chars(&exchange.assistant_text, 100);
        conversation.message_count += 2;
        Ok(())
    }

    async fn set_title_if_default(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> klara_persist::Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(conversation) = state.conversations.get_mut(conversation_id) {
            if conversation.title == DEFAULT_CONVERSATION_TITLE {
                conversation.title = title.to_string();
            }
        }
        Ok(())
    }

    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: i64,
    ) -> klara_persist::Result<Vec<StoredMessage>> {
        let mut messages = self.messages_for(conversation_id);
        let keep = limit.max(0) as usize;
        if messages.len() > keep {
            messages.drain(..messages.len() - keep);
        }
        Ok(messages)
    }

    async fn list_conversations(
        &self,
        user_id: &str,
        limit: i64,
    ) -> klara_persist::Result<Vec<Conversation>> {
        let mut conversations: Vec<Conversation> = self
            .state
            .lock()
            .unwrap()
            .conversations
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        conversations.sort_by_key(|c| std::cmp::Reverse(c.last_activity));
        conversations.truncate(limit.max(0) as usize);
        Ok(conversations)
    }
}

/// Scripted `ChatBackend` double with call counting.
pub struct ScriptedBackend {
    outcome: AskOutcome,
    fail: bool,
    pub calls: AtomicUsize,
    pub last_request: Mutex<Option<AskRequest>>,
}

impl ScriptedBackend {
    pub fn answering(text: &str) -> Self {
        Self {
            outcome: AskOutcome {
                text: text.to_string(),
                sources: vec![Source::new("Polkadot Wiki", "https://wiki.polkadot.network")],
                follow_up_questions: vec!["Tell me more?".to_string()],
                remaining_requests: 42,
                served_by: ServedBy::Upstream,
            },
            fail: false,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        let mut backend = Self::answering("unused");
        backend.fail = true;
        backend
    }

    pub fn with_follow_ups(mut self, follow_ups: Vec<String>) -> Self {
        self.outcome.follow_up_questions = follow_ups;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn ask(&self, request: AskRequest) -> Result<AskOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        if self.fail {
            anyhow::bail!("scripted backend failure");
        }
        Ok(self.outcome.clone())
    }
}

/// Audit sink double collecting entries.
#[derive(Default)]
pub struct RecordingAudit {
    pub entries: Mutex<Vec<AuditEntry>>,
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}
