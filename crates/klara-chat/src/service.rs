use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::warn;

use klara_audit::{AuditEntry, AuditSink};
use klara_cache::{CacheKey, CacheStore};
use klara_persist::{ConversationStore, Exchange, PersistError};
use klara_types::{truncate_chars, ChatQueryRequest, ChatQueryResponse};
use klara_upstream::{AskRequest, ChatBackend};

use crate::dedup::{DedupGuard, DEDUP_LOCK_TTL};
use crate::error::{ChatError, Result};
use crate::followups::{self, DEFAULT_FOLLOW_UP_PROBABILITY};
use crate::history::{HistoryAssembler, HISTORY_CACHE_TTL};
use crate::{tasks, validate};

/// Conversation titles derived from the first user message are capped to
/// this many characters.
const TITLE_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Maximum prior turns sent upstream as context.
    pub history_limit: usize,
    pub dedup_lock_ttl: Duration,
    pub history_cache_ttl: Duration,
    pub follow_up_probability: f64,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            history_limit: 5,
            dedup_lock_ttl: DEDUP_LOCK_TTL,
            history_cache_ttl: HISTORY_CACHE_TTL,
            follow_up_probability: DEFAULT_FOLLOW_UP_PROBABILITY,
        }
    }
}

/// Orchestrates one chat request end to end.
///
/// Control flow: validate → dedup lock → resolve conversation → assemble
/// history → upstream call → follow-up selection → persist exchange →
/// audit (fire-and-forget). Cleanup (lock release + history-cache
/// invalidation) always runs, success or failure.
pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    cache: Arc<dyn CacheStore>,
    backend: Arc<dyn ChatBackend>,
    audit: Arc<dyn AuditSink>,
    options: ChatOptions,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        cache: Arc<dyn CacheStore>,
        backend: Arc<dyn ChatBackend>,
        audit: Arc<dyn AuditSink>,
        options: ChatOptions,
    ) -> Self {
        Self {
            store,
            cache,
            backend,
            audit,
            options,
        }
    }

    pub async fn handle(
        &self,
        request: ChatQueryRequest,
        client_ip: Option<String>,
    ) -> Result<ChatQueryResponse> {
        // Validation happens before any lock is taken.
        validate::validate(&request)?;

        let dedup = DedupGuard::new(Arc::clone(&self.cache), self.options.dedup_lock_ttl);
        let Some(lock_key) = dedup.acquire(&request.user_id, &request.message).await? else {
            // The in-flight lock stays untouched; it expires on its own.
            return Err(ChatError::DuplicateRequest);
        };

        let started = Instant::now();
        let outcome = self
            .process(&request, client_ip, &dedup, &lock_key, started)
            .await;

        let touched_conversation = match &outcome {
            Ok(response) => response.conversation_id.clone(),
            Err(_) => request.conversation_id.clone(),
        };
        self.cleanup(&dedup, &lock_key, touched_conversation.as_deref())
            .await;

        outcome
    }

    async fn process(
        &self,
        request: &ChatQueryRequest,
        client_ip: Option<String>,
        dedup: &DedupGuard,
        lock_key: &CacheKey,
        started: Instant,
    ) -> Result<ChatQueryResponse> {
        // Conversation resolver: an existing id must belong to the caller.
        let existing = match &request.conversation_id {
            None => None,
            Some(id) => {
                let conversation = match self.store.get_conversation(id).await {
                    Ok(conversation) => conversation,
                    // A malformed id resolves like an unknown one.
                    Err(PersistError::InvalidObjectId(_)) => None,
                    Err(e) => return Err(e.into()),
                };
                match conversation {
                    Some(c) if c.user_id == request.user_id => Some(c),
                    _ => {
                        return Err(ChatError::Forbidden(
                            "conversation does not belong to this user".to_string(),
                        ))
                    }
                }
            }
        };
        let is_new_conversation = existing.is_none();

        // History assembler.
        let assembler = HistoryAssembler::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.store),
            self.options.history_limit,
            self.options.history_cache_ttl,
        );
        let history = assembler
            .assemble(
                request.conversation_history.clone(),
                request.conversation_id.as_deref(),
            )
            .await?;

        // Upstream call. The adapter degrades to a fallback internally;
        // an Err here means the call machinery itself failed.
        let ask = AskRequest::new(&request.message, &request.user_id)
            .with_client_ip(client_ip)
            .with_history(history);
        let outcome = match self.backend.ask(ask).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // Release the lock right away so a legitimate retry is
                // not blocked for the full TTL.
                if let Err(release_err) = dedup.release(lock_key).await {
                    warn!("Early lock release failed: {}", release_err);
                }
                return Err(ChatError::Internal(format!("upstream call failed: {e:#}")));
            }
        };

        let follow_ups = followups::select_follow_ups(
            &outcome.text,
            outcome.follow_up_questions.clone(),
            self.options.follow_up_probability,
        );

        // Message persister. New conversations are allocated only after a
        // successful model response.
        let first_message = existing.as_ref().map_or(true, |c| c.message_count == 0);
        let conversation_id = match &existing {
            Some(c) => c.id.to_hex(),
            None => {
                let created = self
                    .store
                    .create_conversation(
                        &request.user_id,
                        klara_persist::DEFAULT_CONVERSATION_TITLE,
                    )
                    .await?;
                created.id.to_hex()
            }
        };

        let exchange = Exchange::now(
            &request.message,
            &outcome.text,
            outcome.sources.clone(),
            follow_ups.clone(),
        );
        self.store.append_exchange(&conversation_id, exchange).await?;

        if first_message {
            self.store
                .set_title_if_default(&conversation_id, &derive_title(&request.message))
                .await?;
        }

        // Audit logger: fire-and-forget, never on the critical path.
        let audit = Arc::clone(&self.audit);
        let entry = AuditEntry {
            conversation_id: Some(conversation_id.clone()),
            user_id: request.user_id.clone(),
            query: request.message.clone(),
            response: outcome.text.clone(),
            status: outcome.served_by.as_str().to_string(),
            response_time_ms: started.elapsed().as_millis() as i64,
            created_at: Utc::now(),
        };
        tasks::spawn_best_effort("audit-log", async move { audit.record(entry).await });

        Ok(ChatQueryResponse {
            text: outcome.text,
            sources: outcome.sources,
            follow_up_questions: follow_ups,
            is_new_conversation,
            conversation_id: Some(conversation_id),
        })
    }

    /// Release the dedup lock and invalidate cached history. The two run
    /// concurrently and failures are recorded individually; neither can
    /// affect the response already computed.
    async fn cleanup(&self, dedup: &DedupGuard, lock_key: &CacheKey, conversation_id: Option<&str>) {
        let release = dedup.release(lock_key);
        let invalidate = async {
            match conversation_id {
                Some(id) => {
                    self.cache
                        .delete(&CacheKey::ConversationHistory {
                            conversation_id: id.to_string(),
                        })
                        .await
                }
                None => Ok(()),
            }
        };

        let (released, invalidated) = tokio::join!(release, invalidate);
        if let Err(e) = released {
            warn!("Failed to release dedup lock: {}", e);
        }
        if let Err(e) = invalidated {
            warn!("Failed to invalidate cached history: {}", e);
        }
    }
}

/// Conversation title from the first user message: capped to 50 chars,
/// ellipsis only when actually truncated.
fn derive_title(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.chars().count() > TITLE_CHARS {
        format!("{}...", truncate_chars(trimmed, TITLE_CHARS))
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::derive_title;

    #[test]
    fn short_titles_are_untouched() {
        assert_eq!(derive_title("What is OpenGov?"), "What is OpenGov?");
    }

    #[test]
    fn long_titles_are_truncated_with_ellipsis() {
        let long = "a".repeat(80);
        let title = derive_title(&long);
        assert_eq!(title.chars().count(), 53);
        assert!(title.ends_with("..."));
    }
}
