use klara_types::ChatQueryRequest;

use crate::error::{ChatError, Result};

pub const MAX_MESSAGE_CHARS: usize = 500;
pub const MAX_USER_ID_CHARS: usize = 100;

/// Validate an inbound chat request before any lock is taken.
pub fn validate(request: &ChatQueryRequest) -> Result<()> {
    if request.message.trim().is_empty() || request.user_id.trim().is_empty() {
        return Err(ChatError::InvalidRequest(
            "message and userId are required".to_string(),
        ));
    }
    if request.message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ChatError::InvalidRequest(format!(
            "message exceeds {MAX_MESSAGE_CHARS} characters"
        )));
    }
    if request.user_id.chars().count() > MAX_USER_ID_CHARS {
        return Err(ChatError::InvalidRequest(format!(
            "userId exceeds {MAX_USER_ID_CHARS} characters"
        )));
    }
    Ok(())
}
