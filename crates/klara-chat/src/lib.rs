pub mod dedup;
pub mod error;
pub mod followups;
pub mod history;
pub mod service;
pub mod tasks;
pub mod validate;

pub use dedup::DedupGuard;
pub use error::{ChatError, Result};
pub use history::HistoryAssembler;
pub use service::{ChatOptions, ChatService};
