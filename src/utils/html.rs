/// Maximum length, in characters, of a stored free-text answer.
pub const MAX_TEXT_RESPONSE_CHARS: u64 = 5000;

/// Maximum length, in characters, of a reviewer's note on a free-text answer.
pub const MAX_REVIEW_FEEDBACK_CHARS: u64 = 2000;

/// Clean user-supplied HTML using the ammonia library.
///
/// Free-text answers are rendered to reviewers and on result pages, so they go
/// through the same whitelist sanitizer as any other stored markup: safe tags
/// (like <b>, <p>) survive, <script>/<iframe> and event-handler attributes do not.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitizes an optional free-text field, collapsing blank input to `None`.
pub fn clean_optional_text(input: Option<&str>) -> Option<String> {
    let trimmed = input?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned = clean_html(trimmed);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_is_stripped() {
        let cleaned = clean_html("<p>ok</p><script>alert(1)</script>");
        assert_eq!(cleaned, "<p>ok</p>");
    }

    #[test]
    fn test_blank_text_is_none() {
        assert_eq!(clean_optional_text(Some("   ")), None);
        assert_eq!(clean_optional_text(None), None);
        assert_eq!(clean_optional_text(Some("<script>x</script>")), None);
        assert_eq!(
            clean_optional_text(Some("  a lever  ")),
            Some("a lever".to_string())
        );
    }
}
