use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use klara_cache::{CacheKey, CacheStore};
use klara_persist::{ConversationStore, Sender, StoredMessage};
use klara_types::ChatTurn;

use crate::error::Result;

/// How long reconstructed history stays cached before the next request
/// rebuilds it from the store.
pub const HISTORY_CACHE_TTL: Duration = Duration::from_secs(300);

/// Pair consecutive user→ai messages into turns, in chronological order.
/// Messages without a paired successor are skipped.
pub fn pair_turns(messages: &[StoredMessage]) -> Vec<ChatTurn> {
    let mut turns = Vec::new();
    let mut i = 0;
    while i < messages.len() {
        if messages[i].sender == Sender::User {
            if let Some(next) = messages.get(i + 1) {
                if next.sender == Sender::Ai {
                    turns.push(ChatTurn {
                        query: messages[i].text.clone(),
                        response: next.text.clone(),
                        timestamp: messages[i].created_at,
                    });
                    i += 2;
                    continue;
                }
            }
        }
        i += 1;
    }
    turns
}

/// Keep only the last `limit` turns, order preserved.
pub fn bounded(mut turns: Vec<ChatTurn>, limit: usize) -> Vec<ChatTurn> {
    if turns.len() > limit {
        turns.drain(..turns.len() - limit);
    }
    turns
}

/// Produces the prior turns sent upstream as context.
///
/// Preference order: client-supplied history, then the short-TTL cache,
/// then reconstruction from the persistent store (which also writes the
/// cache back, fire-and-forget).
pub struct HistoryAssembler {
    cache: Arc<dyn CacheStore>,
    store: Arc<dyn ConversationStore>,
    limit: usize,
    cache_ttl: Duration,
}

impl HistoryAssembler {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        store: Arc<dyn ConversationStore>,
        limit: usize,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            store,
            limit,
            cache_ttl,
        }
    }

    pub async fn assemble(
        &self,
        client_history: Option<Vec<ChatTurn>>,
        conversation_id: Option<&str>,
    ) -> Result<Vec<ChatTurn>> {
        // 1. Client-supplied history is trusted as-is, just bounded.
        if let Some(history) = client_history {
            if !history.is_empty() {
                return Ok(bounded(history, self.limit));
            }
        }

        let Some(conversation_id) = conversation_id else {
            return Ok(Vec::new());
        };

        // 2. Short-TTL cache. Read failures fall through to the store.
        let key = CacheKey::ConversationHistory {
            conversation_id: conversation_id.to_string(),
        };
        match self.cache.get(&key).await {
            Ok(Some(blob)) => match serde_json::from_str::<Vec<ChatTurn>>(&blob) {
                Ok(turns) => return Ok(bounded(turns, self.limit)),
                Err(e) => debug!("Discarding unparseable cached history: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("History cache read failed, using store: {}", e),
        }

        // 3. Reconstruct from the store and cache the result.
        let messages = self
            .store
            .recent_messages(conversation_id, (self.limit * 2) as i64)
            .await?;
        let turns = bounded(pair_turns(&messages), self.limit);

        // Best-effort write-back: a failure costs one rebuild, nothing
        // more. Awaited so it cannot race the end-of-request invalidation.
        if !turns.is_empty() {
            if let Ok(blob) = serde_json::to_string(&turns) {
                if let Err(e) = self.cache.set(&key, &blob, self.cache_ttl).await {
                    warn!("History cache write-back failed: {}", e);
                }
            }
        }

        Ok(turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use chrono::{Duration as ChronoDuration, Utc};

    fn message(sender: Sender, text: &str, offset_ms: i64) -> StoredMessage {
        StoredMessage {
            id: ObjectId::new(),
            conversation_id: ObjectId::new(),
            sender,
            text: text.to_string(),
            created_at: Utc::now() + ChronoDuration::milliseconds(offset_ms),
            sources: None,
            follow_up_questions: None,
            streaming: false,
        }
    }

    #[test]
    fn pairs_alternating_messages_in_order() {
        let messages = vec![
            message(Sender::User, "q1", 0),
            message(Sender::Ai, "r1", 5),
            message(Sender::User, "q2", 10),
            message(Sender::Ai, "r2", 15),
            message(Sender::User, "q3", 20),
            message(Sender::Ai, "r3", 25),
        ];
        let turns = pair_turns(&messages);
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].query, "q1");
        assert_eq!(turns[0].response, "r1");
        assert_eq!(turns[2].query, "q3");
        assert_eq!(turns[2].response, "r3");
    }

    #[test]
    fn skips_unpaired_messages() {
        let messages = vec![
            message(Sender::Ai, "orphan answer", 0),
            message(Sender::User, "q1", 5),
            message(Sender::Ai, "r1", 10),
            message(Sender::User, "dangling question", 15),
        ];
        let turns = pair_turns(&messages);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].query, "q1");
    }

    #[test]
    fn bounded_keeps_the_most_recent_turns() {
        let turns: Vec<ChatTurn> = (0..8)
            .map(|i| ChatTurn::new(format!("q{i}"), format!("r{i}")))
            .collect();
        let kept = bounded(turns, 5);
        assert_eq!(kept.len(), 5);
        assert_eq!(kept[0].query, "q3");
        assert_eq!(kept[4].query, "q7");
    }

    #[test]
    fn bounded_is_a_noop_under_the_limit() {
        let turns = vec![ChatTurn::new("q", "r")];
        assert_eq!(bounded(turns.clone(), 5), turns);
    }
}
