pub mod error;
pub mod models;
pub mod mongo;
pub mod trait_client;

pub use error::{PersistError, Result};
pub use models::{Conversation, Exchange, Sender, StoredMessage, DEFAULT_CONVERSATION_TITLE};
pub use mongo::MongoConversationStore;
pub use trait_client::ConversationStore;
