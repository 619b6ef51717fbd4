use anyhow::Result;
use async_trait::async_trait;

use klara_types::{ChatTurn, Source};

/// Trait for the upstream chat model call.
///
/// The production implementation is [`crate::HttpChatBackend`]; tests
/// substitute scripted doubles.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Answer a user question. Implementations degrade to a deterministic
    /// fallback rather than surfacing upstream outages; an `Err` means the
    /// call machinery itself failed.
    async fn ask(&self, request: AskRequest) -> Result<AskOutcome>;
}

#[derive(Debug, Clone)]
pub struct AskRequest {
    pub question: String,
    pub user_id: String,
    pub client_ip: Option<String>,
    pub history: Vec<ChatTurn>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            user_id: user_id.into(),
            client_ip: None,
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_client_ip(mut self, client_ip: Option<String>) -> Self {
        self.client_ip = client_ip;
        self
    }
}

#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub text: String,
    pub sources: Vec<Source>,
    pub follow_up_questions: Vec<String>,
    pub remaining_requests: u32,
    pub served_by: ServedBy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedBy {
    Upstream,
    Fallback,
}

impl ServedBy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upstream => "success",
            Self::Fallback => "fallback",
        }
    }
}
