use regex::{Regex, RegexBuilder};

use tails_types::LogLine;

/// Compiled search term
///
/// The term is matched literally (regex metacharacters are escaped) and
/// case-insensitively. The same matcher drives both line filtering and the
/// highlight overlay so the two always agree.
#[derive(Clone)]
pub struct SearchPattern {
    /// Literal, escaped, case-insensitive matcher
    regex: Regex,

    /// Original term
    term: String,
}

impl SearchPattern {
    /// Compile a search term. Returns `Ok(None)` for the empty term.
    pub fn new(term: &str) -> Result<Option<Self>, regex::Error> {
        if term.is_empty() {
            return Ok(None);
        }

        let regex = RegexBuilder::new(&regex::escape(term))
            .case_insensitive(true)
            .build()?;

        Ok(Some(Self {
            regex,
            term: term.to_string(),
        }))
    }

    /// Byte range of the first occurrence
    pub fn find(&self, text: &str) -> Option<(usize, usize)> {
        self.regex
            .find(text)
            .filter(|m| !m.is_empty())
            .map(|m| (m.start(), m.end()))
    }

    /// Check if a line contains the term
    pub fn matches(&self, line: &LogLine) -> bool {
        self.regex.is_match(&line.text)
    }

    /// Get the original term
    pub fn term(&self) -> &str {
        &self.term
    }
}

impl std::fmt::Debug for SearchPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchPattern")
            .field("term", &self.term)
            .finish()
    }
}
