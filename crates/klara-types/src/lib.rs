pub mod turn;
pub mod wire;

pub use turn::{ChatTurn, Source};
pub use wire::{ChatQueryRequest, ChatQueryResponse};

/// Truncate a string to at most `max` characters, never splitting a
/// code point. Returns the input unchanged when it already fits.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::truncate_chars;

    #[test]
    fn truncate_leaves_short_strings_alone() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        // Each kanji is 3 bytes; truncation must respect char boundaries.
        assert_eq!(truncate_chars("日本語テスト", 3), "日本語");
    }

    #[test]
    fn truncate_exact_limit() {
        assert_eq!(truncate_chars("abcde", 5), "abcde");
        assert_eq!(truncate_chars("abcdef", 5), "abcde");
    }
}
