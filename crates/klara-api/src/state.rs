use std::sync::Arc;

use klara_chat::ChatService;
use klara_persist::ConversationStore;

use crate::config::Config;

/// Shared application state passed to all handlers.
///
/// All resources are wrapped in Arc for efficient sharing across async
/// tasks. The ChatService is stateless and created once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub chat: Arc<ChatService>,
    pub store: Arc<dyn ConversationStore>,
}

impl AppState {
    pub fn new(config: Config, chat: ChatService, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            config: Arc::new(config),
            chat: Arc::new(chat),
            store,
        }
    }
}
