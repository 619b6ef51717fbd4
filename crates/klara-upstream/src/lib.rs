pub mod client;
pub mod fallback;
pub mod health;
pub mod traits;

pub use client::{HttpChatBackend, UpstreamConfig};
pub use fallback::{fallback_answer, FALLBACK_REMAINING_REQUESTS};
pub use health::HealthTracker;
pub use traits::{AskOutcome, AskRequest, ChatBackend, ServedBy};
