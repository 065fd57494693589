//! Locating the highlighted span for a suggestion
//!
//! The model is asked for the exact words to highlight, but its reply is not
//! guaranteed to occur verbatim in the text. These heuristics map a reply (or,
//! when the model is unreachable, the question itself) onto real character
//! offsets. Every returned span is the document's own substring.

use crate::types::Span;
use once_cell::sync::Lazy;
use regex::Regex;

/// Longest gap (in characters) between words of a partially matched reply
const MAX_WORD_GAP: usize = 50;

/// Length of the fallback span when the text has no sentence terminator
const FALLBACK_SPAN_CHARS: usize = 100;

static KEYWORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w{4,}\b").expect("keyword pattern is valid"));

/// Text prepared for case-insensitive, character-indexed search
struct Haystack<'a> {
    text: &'a str,
    chars: Vec<char>,
    lowered: Vec<char>,
}

impl<'a> Haystack<'a> {
    fn new(text: &'a str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let lowered = chars.iter().map(|c| lower(*c)).collect();
        Self {
            text,
            chars,
            lowered,
        }
    }

    fn len(&self) -> usize {
        self.chars.len()
    }

    /// First occurrence of `needle` (already lowered) at or after `from`
    fn find(&self, needle: &[char], from: usize) -> Option<usize> {
        if needle.is_empty() || needle.len() > self.lowered.len() {
            return None;
        }
        (from..=self.lowered.len() - needle.len())
            .find(|&i| self.lowered[i..i + needle.len()] == *needle)
    }

    fn find_char(&self, target: char, from: usize) -> Option<usize> {
        (from..self.chars.len()).find(|&i| self.chars[i] == target)
    }

    fn rfind_char(&self, target: char, before: usize) -> Option<usize> {
        (0..before.min(self.chars.len()))
            .rev()
            .find(|&i| self.chars[i] == target)
    }

    /// Span over `[start, end)` with surrounding whitespace trimmed
    fn span(&self, mut start: usize, mut end: usize) -> Option<Span> {
        end = end.min(self.len());
        while start < end && self.chars[start].is_whitespace() {
            start += 1;
        }
        while end > start && self.chars[end - 1].is_whitespace() {
            end -= 1;
        }
        if start == end {
            return None;
        }
        Span::from_snapshot(self.text, start, end).ok()
    }
}

fn lower(c: char) -> char {
    // One char in, one char out, so offsets in the lowered copy stay aligned
    c.to_lowercase().next().unwrap_or(c)
}

fn lowered(s: &str) -> Vec<char> {
    s.chars().map(lower).collect()
}

/// True when the model reported nothing worth highlighting
fn is_no_highlight(reply: &str) -> bool {
    let reply = reply.to_lowercase();
    reply.contains("no specific issues found") || reply.contains("no_highlight")
}

/// Map the model's span reply onto `text`
pub fn locate_reply(text: &str, reply: &str) -> Option<Span> {
    let reply = reply.trim().trim_matches('"').trim_matches('\'').trim();
    if reply.is_empty() || is_no_highlight(reply) {
        return None;
    }

    let hay = Haystack::new(text);
    let needle = lowered(reply);

    if let Some(start) = hay.find(&needle, 0) {
        return hay.span(start, start + needle.len());
    }

    // Anchor on the first word, then pull in following words that appear nearby
    let mut words = reply.split_whitespace().map(lowered);
    if let Some(first) = words.next() {
        if let Some(start) = hay.find(&first, 0) {
            let mut end = start + first.len();
            for word in words {
                match hay.find(&word, end) {
                    Some(next) if next - end < MAX_WORD_GAP => end = next + word.len(),
                    _ => break,
                }
            }
            return hay.span(start, end);
        }
    }

    first_sentence(&hay)
}

/// Highlight the longest sentence containing a keyword from the question
pub fn locate_by_keywords(text: &str, question: &str) -> Option<Span> {
    let hay = Haystack::new(text);
    let question = question.to_lowercase();

    let mut best: Option<(usize, usize, usize)> = None;
    for word in KEYWORD_PATTERN.find_iter(&question) {
        let Some(word_pos) = hay.find(&lowered(word.as_str()), 0) else {
            continue;
        };
        let start = hay.rfind_char('.', word_pos).map(|p| p + 1).unwrap_or(0);
        let end = hay
            .find_char('.', word_pos)
            .map(|p| p + 1)
            .unwrap_or(hay.len());
        let trimmed_len = hay.span(start, end).map(|s| s.end() - s.start()).unwrap_or(0);
        if best.map_or(true, |(_, _, len)| trimmed_len > len) {
            best = Some((start, end, trimmed_len));
        }
    }

    match best {
        Some((start, end, len)) if len > 0 => hay.span(start, end),
        _ => first_sentence(&hay),
    }
}

fn first_sentence(hay: &Haystack) -> Option<Span> {
    let end = hay
        .find_char('.', 0)
        .map(|p| p + 1)
        .unwrap_or_else(|| FALLBACK_SPAN_CHARS.min(hay.len()));
    hay.span(0, end)
}
