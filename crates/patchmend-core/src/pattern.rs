//! Marker and anchor matching.
//!
//! Every "is this declaration present" and "where does this declaration
//! start" question the patcher and validator ask goes through
//! [`TextPattern`], so presence checks and anchor placement share one
//! definition of a match.

use regex::Regex;

use crate::domain::{PatchmendError, Result};

const LITERAL_PREFIX: &str = "literal:";

/// Where a pattern matched, in byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    /// Offset just past the newline that terminates the line holding `end`,
    /// or the content length when that line is the last one.
    pub line_end: usize,
}

/// A compiled marker/anchor.
#[derive(Debug, Clone)]
pub struct TextPattern {
    source: String,
    regex: Regex,
}

impl TextPattern {
    /// Exact substring match.
    pub fn literal(text: &str) -> Self {
        Self {
            source: format!("{LITERAL_PREFIX}{text}"),
            regex: Regex::new(&regex::escape(text)).expect("escaped literal is a valid regex"),
        }
    }

    /// Regular-expression match. Use `(?m)` for line anchors.
    pub fn regex(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| PatchmendError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Parse a configured pattern: `literal:<text>` or a regex.
    pub fn parse(text: &str) -> Result<Self> {
        match text.strip_prefix(LITERAL_PREFIX) {
            Some(text) => Ok(Self::literal(text)),
            None => Self::regex(text),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// First match, if any.
    pub fn locate(&self, content: &str) -> Option<Span> {
        let m = self.regex.find(content)?;
        Some(Span {
            start: m.start(),
            end: m.end(),
            line_end: line_end_after(content, m.end()),
        })
    }

    /// Every non-overlapping match, in order.
    pub fn locate_all<'a>(&'a self, content: &'a str) -> impl Iterator<Item = Span> + 'a {
        self.regex.find_iter(content).map(move |m| Span {
            start: m.start(),
            end: m.end(),
            line_end: line_end_after(content, m.end()),
        })
    }

    pub fn is_present(&self, content: &str) -> bool {
        self.regex.is_match(content)
    }

    pub fn count(&self, content: &str) -> usize {
        self.regex.find_iter(content).count()
    }
}

fn line_end_after(content: &str, end: usize) -> usize {
    if end > 0 && content.as_bytes()[end - 1] == b'\n' {
        return end;
    }
    match content[end..].find('\n') {
        Some(i) => end + i + 1,
        None => content.len(),
    }
}
