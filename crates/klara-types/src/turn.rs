use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One (user query, assistant response) pair, used as context for the
/// upstream model. Derived from persisted messages or supplied by the
/// client; never persisted as its own entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub query: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Citation attached to an assistant answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
}

impl Source {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_round_trips_through_json() {
        let turn = ChatTurn::new("What is OpenGov?", "OpenGov is the governance system.");
        let json = serde_json::to_string(&turn).unwrap();
        let back: ChatTurn = serde_json::from_str(&json).unwrap();
        assert_eq!(turn, back);
    }

    #[test]
    fn turn_fields_are_snake_case_free() {
        let turn = ChatTurn::new("q", "r");
        let value = serde_json::to_value(&turn).unwrap();
        assert!(value.get("query").is_some());
        assert!(value.get("response").is_some());
        assert!(value.get("timestamp").is_some());
    }
}
