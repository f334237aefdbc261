const MAX_LOG_MESSAGE_LENGTH: usize = 100;
const MAX_SETUP_ERROR_LENGTH: usize = 150;

/// Cut `text` to at most `max` characters, appending "..." when shortened.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((idx, _)) => format!("{}...", &text[..idx]),
    }
}

/// Shorten an upstream failure message for a per-request log line.
pub fn truncate_error(error: &str) -> String {
    truncate_chars(error, MAX_LOG_MESSAGE_LENGTH)
}

/// Shorten a failure that aborted a whole backend section.
pub fn truncate_setup_error(error: &str) -> String {
    truncate_chars(error, MAX_SETUP_ERROR_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_untouched() {
        assert_eq!(truncate_error("HTTP 500"), "HTTP 500");
    }

    #[test]
    fn test_long_text_truncated() {
        let long = "x".repeat(250);
        let out = truncate_error(&long);
        assert_eq!(out.len(), MAX_LOG_MESSAGE_LENGTH + 3);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let text = "é".repeat(120);
        let out = truncate_chars(&text, 10);
        assert_eq!(out.chars().count(), 13);
    }

    #[test]
    fn test_setup_error_limit() {
        let long = "y".repeat(400);
        assert_eq!(truncate_setup_error(&long).chars().count(), MAX_SETUP_ERROR_LENGTH + 3);
    }
}
