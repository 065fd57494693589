//! String utility functions for character-offset text manipulation
//!
//! Span offsets throughout the crate count Unicode scalar values, not bytes.
//! These helpers convert between the two without ever slicing inside a
//! multi-byte character.

/// Number of characters in `s`
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of character index `char_idx`, or `None` past the end.
///
/// `char_idx == char_len(s)` maps to `s.len()`.
pub fn byte_offset(s: &str, char_idx: usize) -> Option<usize> {
    if char_idx == 0 {
        return Some(0);
    }
    let mut count = 0;
    for (byte_idx, _) in s.char_indices() {
        if count == char_idx {
            return Some(byte_idx);
        }
        count += 1;
    }
    if count == char_idx {
        Some(s.len())
    } else {
        None
    }
}

/// Substring between character offsets `[start, end)`.
///
/// Returns `None` when the range is inverted or runs past the end.
pub fn char_slice(s: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let from = byte_offset(s, start)?;
    let to = byte_offset(s, end)?;
    Some(&s[from..to])
}

/// Safely truncate a string at a character boundary, adding ellipsis if truncated.
///
/// # Examples
/// ```
/// use daemon_ai_core::utils::string::truncate_at_char_boundary;
///
/// assert_eq!(truncate_at_char_boundary("hello world", 5), "hello...");
/// assert_eq!(truncate_at_char_boundary("hello", 10), "hello");
/// assert_eq!(truncate_at_char_boundary("héllo wörld", 7), "héllo w...");
/// ```
pub fn truncate_at_char_boundary(s: &str, max_chars: usize) -> String {
    match byte_offset(s, max_chars) {
        Some(cut) if cut < s.len() => format!("{}...", &s[..cut]),
        _ => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_len_counts_scalars() {
        assert_eq!(char_len(""), 0);
        assert_eq!(char_len("abc"), 3);
        assert_eq!(char_len("a→b"), 3);
    }

    #[test]
    fn test_byte_offset_multibyte() {
        let text = "a→b";
        assert_eq!(byte_offset(text, 0), Some(0));
        assert_eq!(byte_offset(text, 1), Some(1));
        assert_eq!(byte_offset(text, 2), Some(4));
        assert_eq!(byte_offset(text, 3), Some(5));
        assert_eq!(byte_offset(text, 4), None);
    }

    #[test]
    fn test_char_slice() {
        assert_eq!(char_slice("the quick fox", 4, 9), Some("quick"));
        assert_eq!(char_slice("the quick fox", 10, 13), Some("fox"));
        assert_eq!(char_slice("the quick fox", 10, 14), None);
        assert_eq!(char_slice("the quick fox", 5, 4), None);
        assert_eq!(char_slice("naïve café", 6, 10), Some("café"));
    }

    #[test]
    fn test_truncate_exact() {
        assert_eq!(truncate_at_char_boundary("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_empty() {
        assert_eq!(truncate_at_char_boundary("", 5), "");
    }

    #[test]
    fn test_truncate_multibyte_arrow() {
        let text = "Phase 4.1→4.2 complete";
        assert_eq!(truncate_at_char_boundary(text, 10), "Phase 4.1→...");
    }
}
