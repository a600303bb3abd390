use std::time::Instant;

use tails_logs::{ArcLogLine, LogBuffer, RuleSet, SearchController};

/// Default page size until the log pane has been measured
const DEFAULT_PAGE: usize = 20;

/// Cache for filtered lines to avoid re-filtering on every render
#[derive(Default)]
pub struct FilterCache {
    /// Settled query the cache was built for
    cached_query: String,
    /// Lines ever pushed when the cache was built
    cached_pushed: u64,
    /// Buffer length when the cache was built
    cached_len: usize,
    /// The cached visible lines
    pub cached_lines: Vec<ArcLogLine>,
    pub is_valid: bool,
}

impl FilterCache {
    pub fn needs_refresh(&self, query: &str, buffer: &LogBuffer) -> bool {
        !self.is_valid
            || self.cached_pushed != buffer.total_pushed()
            || self.cached_len != buffer.len()
            || self.cached_query != query
    }

    pub fn update(&mut self, query: &str, buffer: &LogBuffer, lines: Vec<ArcLogLine>) {
        self.cached_query = query.to_string();
        self.cached_pushed = buffer.total_pushed();
        self.cached_len = buffer.len();
        self.cached_lines = lines;
        self.is_valid = true;
    }

    pub fn invalidate(&mut self) {
        self.is_valid = false;
    }
}

/// Severity of a status bar notice
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message shown in the status bar until dismissed or replaced
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// UI-specific transient state
pub struct UiState {
    /// Is the search bar focused?
    pub search_active: bool,

    /// Is help overlay visible?
    pub help_visible: bool,

    /// Index of the first visible line
    pub log_scroll: usize,

    /// Follow mode: stick to the newest line
    pub auto_scroll: bool,

    /// Lines that fit in the log pane at the last render
    pub page_height: usize,

    pub filter_cache: FilterCache,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            search_active: false,
            help_visible: false,
            log_scroll: 0,
            auto_scroll: true,
            page_height: DEFAULT_PAGE,
            filter_cache: FilterCache::default(),
        }
    }
}

/// Global application state
pub struct AppState {
    /// What is being tailed, shown in the header
    pub source_label: String,

    /// Highlighting rules applied to every visible line
    pub rules: RuleSet,

    pub search: SearchController,

    pub ui_state: UiState,

    pub notice: Option<Notice>,

    /// Whether app should quit
    pub should_quit: bool,
}

impl AppState {
    pub fn new(source_label: impl Into<String>, rules: RuleSet, search: SearchController) -> Self {
        Self {
            source_label: source_label.into(),
            rules,
            search,
            ui_state: UiState::default(),
            notice: None,
            should_quit: false,
        }
    }

    /// Lines passing the settled search, refreshed only when the buffer or query changed
    pub fn visible_lines(&mut self, buffer: &LogBuffer) -> &[ArcLogLine] {
        let query = self.search.debounced_query();
        if self.ui_state.filter_cache.needs_refresh(query, buffer) {
            let lines = self.search.visible_lines(buffer);
            self.ui_state.filter_cache.update(query, buffer, lines);
        }
        &self.ui_state.filter_cache.cached_lines
    }

    pub fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notice = Some(Notice {
            level,
            text: text.into(),
        });
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn toggle_help(&mut self) {
        self.ui_state.help_visible = !self.ui_state.help_visible;
    }

    /// Focus the search bar, keeping the current query for editing
    pub fn start_search(&mut self) {
        self.ui_state.search_active = true;
    }

    /// Leave the search bar and apply the query without waiting
    pub fn apply_search(&mut self) {
        self.ui_state.search_active = false;
        self.search.settle();
    }

    /// Leave the search bar and drop the query
    pub fn cancel_search(&mut self) {
        self.ui_state.search_active = false;
        self.search.restore("");
    }

    pub fn search_input_char(&mut self, c: char, now: Instant) {
        self.search.push_char(c, now);
    }

    pub fn search_input_backspace(&mut self, now: Instant) {
        self.search.pop_char(now);
    }

    pub fn search_clear(&mut self, now: Instant) {
        self.search.set_query("", now);
    }

    /// Append pasted text to the query; line breaks become spaces
    pub fn search_paste(&mut self, text: &str, now: Instant) {
        let mut raw = self.search.raw_query().to_string();
        raw.extend(text.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }));
        self.search.set_query(raw, now);
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.ui_state.auto_scroll = false;
        self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_sub(n);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.ui_state.auto_scroll = false;
        // Clamped to the visible line count at render time
        self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_add(n);
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.ui_state.page_height.max(1));
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.ui_state.page_height.max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.ui_state.auto_scroll = false;
        self.ui_state.log_scroll = 0;
    }

    /// Jump to the newest line and resume following
    pub fn scroll_to_bottom(&mut self) {
        self.ui_state.auto_scroll = true;
        self.ui_state.log_scroll = usize::MAX;
    }

    pub fn toggle_auto_scroll(&mut self) {
        self.ui_state.auto_scroll = !self.ui_state.auto_scroll;
    }

    /// Reset scrolling after the buffer was cleared
    pub fn logs_cleared(&mut self) {
        self.ui_state.log_scroll = 0;
        self.ui_state.auto_scroll = true;
        self.ui_state.filter_cache.invalidate();
    }

    /// Clamp the scroll offset for `total` lines in a pane of `height` rows
    pub fn clamp_scroll(&mut self, total: usize, height: usize) -> usize {
        self.ui_state.page_height = height;
        let max_scroll = total.saturating_sub(height);
        if self.ui_state.auto_scroll || self.ui_state.log_scroll > max_scroll {
            self.ui_state.log_scroll = max_scroll;
        }
        self.ui_state.log_scroll
    }
}
