//! Marker Pattern Matcher
//!
//! Classifies a single line of text against an ordered set of marker tokens.
//! A token is recognised when it follows a comment-opening sequence
//! (`#`, `//`, `/*`, `<!--`, ...) or appears in the bare `TOKEN:` form.
//! Matching is case-insensitive.
//!
//! ## Tie-break
//!
//! When several tokens could match the same line, the token that comes first
//! in configuration order wins, regardless of where in the line each token
//! appears. With the default order `# NOTE: see TODO: later` is a `TODO`.
//!
//! Tokens inside string literals are not distinguished from comments; such
//! false positives are a known limitation.

use crate::core::error::{ScannerError, ScannerResult};
use crate::core::settings::PatternSettings;
use regex::{Regex, RegexSet};

/// A single marker recognised in a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerMatch<'a> {
    /// Configured token (as configured, not as written in the line)
    pub token: &'a str,
    /// From the start of the match to the end of the line, trailing whitespace removed
    pub matched: &'a str,
    /// Byte offset of the match in the line
    pub start: usize,
}

#[derive(Debug, Clone)]
struct MarkerPattern {
    token: String,
    regex: Regex,
}

/// Ordered, immutable set of marker patterns
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<MarkerPattern>,
    prefilter: RegexSet,
}

fn marker_expression(token: &str, prefixes: &str) -> String {
    let token = regex::escape(token);
    format!(r"(?i)(?:(?:{prefixes})[ \t]*{token}\b|\b{token}:)")
}

impl PatternSet {
    pub fn new<T: AsRef<str>, P: AsRef<str>>(
        markers: &[T],
        comment_prefixes: &[P],
    ) -> Result<Self, regex::Error> {
        let prefixes = comment_prefixes
            .iter()
            .map(|p| regex::escape(p.as_ref().trim()))
            .collect::<Vec<_>>()
            .join("|");

        let mut patterns = Vec::with_capacity(markers.len());
        for marker in markers {
            let token = marker.as_ref().trim().to_string();
            let regex = Regex::new(&marker_expression(&token, &prefixes))?;
            patterns.push(MarkerPattern { token, regex });
        }
        let prefilter = RegexSet::new(patterns.iter().map(|p| p.regex.as_str()))?;

        Ok(Self {
            patterns,
            prefilter,
        })
    }

    pub fn from_settings(settings: &PatternSettings) -> ScannerResult<Self> {
        Self::new(&settings.markers, &settings.comment_prefixes).map_err(|e| {
            ScannerError::unknown(format!("Invalid marker pattern configuration: {}", e))
        })
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.token.as_str())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Match `line` against the set; the first configured token that fires wins
    pub fn match_line<'a>(&'a self, line: &'a str) -> Option<MarkerMatch<'a>> {
        // lowest set index == first token in configuration order
        let index = self.prefilter.matches(line).iter().next()?;
        let pattern = &self.patterns[index];
        let found = pattern.regex.find(line)?;

        Some(MarkerMatch {
            token: &pattern.token,
            matched: line[found.start()..].trim_end(),
            start: found.start(),
        })
    }
}
