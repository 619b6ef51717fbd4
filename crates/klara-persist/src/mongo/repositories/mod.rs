pub mod conversation;
pub mod message;

pub use conversation::ConversationRepository;
pub use message::MessageRepository;
