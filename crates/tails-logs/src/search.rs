use std::time::{Duration, Instant};

use tracing::{debug, warn};

use tails_types::ArcLogLine;

use crate::buffer::LogBuffer;
use crate::filter::SearchPattern;

/// Live and debounced search query
///
/// Keystrokes update the raw query immediately; the debounced query (which
/// filters lines and drives highlighting) only changes once the raw query has
/// been left alone for the settle delay.
#[derive(Debug)]
pub struct SearchController {
    raw_query: String,
    debounced_query: String,

    /// Compiled form of `debounced_query`
    pattern: Option<SearchPattern>,

    /// Lowercased `debounced_query` when it could not be compiled
    fallback: Option<String>,

    /// Quiet period before a raw query settles
    delay: Duration,

    /// Armed by `set_query`, cleared by `settle`
    settle_at: Option<Instant>,
}

impl SearchController {
    pub fn new(delay: Duration) -> Self {
        Self {
            raw_query: String::new(),
            debounced_query: String::new(),
            pattern: None,
            fallback: None,
            delay,
            settle_at: None,
        }
    }

    /// Seed both queries, e.g. from a query passed on the command line
    pub fn restore(&mut self, query: impl Into<String>) {
        self.raw_query = query.into();
        self.settle();
    }

    /// Replace the raw query and restart the quiet period
    pub fn set_query(&mut self, raw: impl Into<String>, now: Instant) {
        self.raw_query = raw.into();
        self.settle_at = Some(now + self.delay);
    }

    /// Append a character to the raw query
    pub fn push_char(&mut self, c: char, now: Instant) {
        let mut raw = std::mem::take(&mut self.raw_query);
        raw.push(c);
        self.set_query(raw, now);
    }

    /// Remove the last character of the raw query
    pub fn pop_char(&mut self, now: Instant) {
        let mut raw = std::mem::take(&mut self.raw_query);
        raw.pop();
        self.set_query(raw, now);
    }

    /// Copy the raw query into the debounced one. Returns true if it changed.
    pub fn settle(&mut self) -> bool {
        self.settle_at = None;
        if self.debounced_query == self.raw_query {
            return false;
        }

        self.debounced_query = self.raw_query.clone();
        let compiled = SearchPattern::new(&self.debounced_query);
        self.install(compiled);
        debug!(query = %self.debounced_query, "search settled");
        true
    }

    fn install(&mut self, compiled: Result<Option<SearchPattern>, regex::Error>) {
        match compiled {
            Ok(pattern) => {
                self.pattern = pattern;
                self.fallback = None;
            }
            Err(e) => {
                warn!(error = %e, "search term could not be compiled, matching it as plain text");
                self.pattern = None;
                self.fallback = Some(self.debounced_query.to_lowercase());
            }
        }
    }

    /// Settle if the quiet period has elapsed at `now`
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.settle_at {
            Some(deadline) if now >= deadline => self.settle(),
            _ => false,
        }
    }

    /// When the pending raw query will settle
    pub fn settle_deadline(&self) -> Option<Instant> {
        self.settle_at
    }

    /// Whether the raw query has not settled yet
    pub fn is_pending(&self) -> bool {
        self.settle_at.is_some()
    }

    /// Drop an armed settle deadline without applying it
    pub fn cancel_pending(&mut self) {
        self.settle_at = None;
    }

    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    pub fn debounced_query(&self) -> &str {
        &self.debounced_query
    }

    /// Compiled debounced query, `None` when empty
    pub fn pattern(&self) -> Option<&SearchPattern> {
        self.pattern.as_ref()
    }

    /// Lines to show: everything, or the lines containing the settled query
    pub fn visible_lines(&self, buffer: &LogBuffer) -> Vec<ArcLogLine> {
        match (&self.pattern, &self.fallback) {
            (Some(pattern), _) => buffer.filtered(|line| pattern.matches(line)),
            (None, Some(term)) => {
                buffer.filtered(|line| line.text.to_lowercase().contains(term.as_str()))
            }
            (None, None) => buffer.all(),
        }
    }
}
