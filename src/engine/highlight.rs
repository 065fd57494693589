//! Projection of the selected suggestion onto the live document

use crate::document::Document;
use crate::types::{Suggestion, SuggestionId};

/// Range to highlight in the current document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub suggestion: SuggestionId,
    /// Clamped start, in characters
    pub start: usize,
    /// Clamped end, in characters
    pub end: usize,
    /// Text currently under `[start, end)`; differs from the suggestion's
    /// span text once the document has moved on
    pub text: String,
    pub color: String,
    pub is_outdated: bool,
    /// True when the recorded span had to be clamped to fit
    pub clamped: bool,
}

impl Highlight {
    /// Project `suggestion` onto `document`. `None` when it has no span.
    pub fn project(document: &Document, suggestion: &Suggestion) -> Option<Self> {
        let span = suggestion.span.as_ref()?;
        let len = document.len_chars();
        let end = span.end().min(len);
        let start = span.start().min(end);

        Some(Self {
            suggestion: suggestion.id(),
            start,
            end,
            text: document.slice_clamped(start, end),
            color: suggestion.color.clone(),
            is_outdated: suggestion.is_outdated(),
            clamped: (start, end) != (span.start(), span.end()),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when the document still shows the text the span was taken from
    pub fn matches_span(&self, suggestion: &Suggestion) -> bool {
        suggestion
            .span
            .as_ref()
            .map_or(false, |span| !self.clamped && span.text() == self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Daemon, Span};

    fn suggestion(snapshot: &str, start: usize, end: usize) -> Suggestion {
        let daemon = Daemon {
            id: "d".to_string(),
            name: "D".to_string(),
            prompt: "p".to_string(),
            examples: vec![],
            guardrails: None,
            color: "#3498db".to_string(),
        };
        let span = Span::from_snapshot(snapshot, start, end).unwrap();
        Suggestion::new(
            SuggestionId::from_raw(1),
            &daemon,
            "Clearer?".to_string(),
            Some(span),
            None,
        )
    }

    #[test]
    fn test_projection_in_bounds() {
        let document = Document::new("The quick brown fox");
        let s = suggestion("The quick brown fox", 4, 9);
        let highlight = Highlight::project(&document, &s).unwrap();
        assert_eq!((highlight.start, highlight.end), (4, 9));
        assert_eq!(highlight.text, "quick");
        assert_eq!(highlight.color, "#3498db");
        assert!(!highlight.clamped);
        assert!(highlight.matches_span(&s));
    }

    #[test]
    fn test_projection_clamped_after_shrink() {
        let s = suggestion("The quick brown fox", 10, 19);
        let document = Document::new("The quick");
        let highlight = Highlight::project(&document, &s).unwrap();
        assert_eq!((highlight.start, highlight.end), (9, 9));
        assert!(highlight.is_empty());
        assert!(highlight.clamped);
        assert!(!highlight.matches_span(&s));
    }

    #[test]
    fn test_projection_partially_clamped() {
        let s = suggestion("The quick brown fox", 4, 15);
        let document = Document::new("The quick br");
        let highlight = Highlight::project(&document, &s).unwrap();
        assert_eq!((highlight.start, highlight.end), (4, 12));
        assert_eq!(highlight.text, "quick br");
    }

    #[test]
    fn test_projection_shows_current_text() {
        let s = suggestion("The quick brown fox", 4, 9);
        let document = Document::new("The slow! brown fox");
        let highlight = Highlight::project(&document, &s).unwrap();
        assert_eq!(highlight.text, "slow!");
        assert!(!highlight.matches_span(&s));
    }
}
