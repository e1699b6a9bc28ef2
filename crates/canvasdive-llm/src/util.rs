//! Helpers for turning raw model output into structured data

/// Patterns that must never reach a user-facing error message
const SENSITIVE_PATTERNS: &[&str] = &["api_key", "api-key", "authorization", "bearer", "secret"];

/// Locate the JSON payload inside a model reply.
///
/// Models often wrap JSON in a fenced code block or add a sentence before it.
/// Returns the slice from the first `{` or `[` to the matching last closer, or
/// `None` when no candidate is present.
///
/// # Examples
/// ```
/// use canvasdive_llm::util::extract_json;
/// assert_eq!(extract_json("Sure!\n```json\n{\"a\":1}\n```"), Some("{\"a\":1}"));
/// assert_eq!(extract_json("no json here"), None);
/// ```
#[must_use]
pub fn extract_json(text: &str) -> Option<&str> {
    let body = strip_code_fence(text).unwrap_or(text);
    let start = body.find(['{', '['])?;
    let closer = if body[start..].starts_with('{') {
        '}'
    } else {
        ']'
    };
    let end = body.rfind(closer)?;
    (end > start).then(|| body[start..=end].trim())
}

fn strip_code_fence(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    let body_start = after.find('\n').map_or(0, |i| i + 1);
    let body = &after[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

/// Truncate to at most `max_chars` characters, respecting char boundaries.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Replace provider error text that may leak credentials.
#[must_use]
pub fn sanitize_error_for_user(error: &str) -> String {
    let lower = error.to_lowercase();
    if SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p)) {
        return "The generation service returned an error. Please try again.".to_string();
    }
    error.to_string()
}
