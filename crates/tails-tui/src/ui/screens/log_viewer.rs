use std::borrow::Cow;

use ratatui::{
    Frame,
    layout::{Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use tails_logs::{LogSession, RuleSet, SearchPattern, TAB_WIDTH, build_spans};

use crate::app::AppState;
use crate::ui::components::{HelpOverlay, StatusBar, log_viewer_hints, search_hints};
use crate::ui::{Layout, Theme};

/// Log viewer screen
pub struct LogViewerScreen;

impl LogViewerScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState, session: &LogSession) {
        let show_search = state.ui_state.search_active || !state.search.raw_query().is_empty();
        let areas = Layout::viewer(frame.area(), show_search);

        Self::render_header(frame, areas.header, state, session);
        if let Some(search_area) = areas.search {
            Self::render_search_bar(frame, search_area, state);
        }
        Self::render_logs(frame, areas.logs, state, session);
        Self::render_status_bar(frame, areas.status, state, session);

        if state.ui_state.help_visible {
            HelpOverlay::render(frame);
        }
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &AppState, session: &LogSession) {
        let buffer = session.buffer();
        let gate = session.gate_state();

        let title = Line::from(vec![
            Span::styled("tails", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(state.source_label.as_str(), Theme::text_highlight()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(gate.as_str(), Theme::gate_state(gate)),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(
                format!("{}/{} lines", buffer.len(), buffer.capacity()),
                Theme::text(),
            ),
        ]);

        let header = Paragraph::new(title).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }

    fn render_search_bar(frame: &mut Frame, area: Rect, state: &AppState) {
        let active = state.ui_state.search_active;
        let mut spans = vec![if active {
            Span::styled(
                " /",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(" Search: ", Theme::text_dim())
        }];

        spans.push(Span::styled(
            state.search.raw_query().to_string(),
            Theme::text_highlight(),
        ));

        if active {
            spans.push(Span::styled(
                "█",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::SLOW_BLINK),
            ));
        }

        // Typed but not applied yet
        if state.search.is_pending() {
            spans.push(Span::styled("  …", Theme::text_dim()));
        }

        let search_bar = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(if active {
                    Theme::border_focused()
                } else {
                    Theme::border()
                })
                .title(Span::styled(" Search ", Theme::title())),
        );

        frame.render_widget(search_bar, area);
    }

    fn render_logs(frame: &mut Frame, area: Rect, state: &mut AppState, session: &LogSession) {
        let total = state.visible_lines(session.buffer()).len();

        // Account for the border
        let inner_height = area.height.saturating_sub(2) as usize;
        let scroll = state.clamp_scroll(total, inner_height);

        let rules = &state.rules;
        let pattern = state.search.pattern();
        let lines: Vec<Line> = state
            .ui_state
            .filter_cache
            .cached_lines
            .iter()
            .skip(scroll)
            .take(inner_height)
            .map(|line| styled_line(&line.text, rules, pattern))
            .collect();

        let follow = if state.ui_state.auto_scroll { " ▼" } else { "" };
        let title = match pattern {
            Some(pattern) => format!(" Logs ({} matching '{}'){} ", total, pattern.term(), follow),
            None => format!(" Logs ({}){} ", total, follow),
        };

        let logs_widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(title, Theme::title())),
        );

        frame.render_widget(logs_widget, area);

        if total > inner_height {
            let max_scroll = total.saturating_sub(inner_height);
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut scrollbar_state = ScrollbarState::default()
                .content_length(max_scroll)
                .position(scroll.min(max_scroll));

            frame.render_stateful_widget(
                scrollbar,
                area.inner(Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }

    fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, session: &LogSession) {
        let stats = session.stats();
        let hints = if state.ui_state.search_active {
            search_hints()
        } else {
            log_viewer_hints()
        };

        let mut right = format!("{} accepted", stats.accepted);
        if stats.dropped > 0 {
            right.push_str(&format!(" · {} dropped", stats.dropped));
        }
        if stats.truncated > 0 {
            right.push_str(&format!(" · {} cut", stats.truncated));
        }

        let status = StatusBar::new()
            .hints(hints)
            .notice(state.notice.as_ref())
            .right(right);

        frame.render_widget(status, area);
    }
}

/// One log line as styled spans, tabs expanded for display
pub fn styled_line<'a>(
    text: &'a str,
    rules: &'a RuleSet,
    search: Option<&SearchPattern>,
) -> Line<'a> {
    build_spans(text, rules, search)
        .into_iter()
        .map(|span| Span::styled(expand_tabs(span.text), Theme::for_tag(span.tag)))
        .collect::<Vec<_>>()
        .into()
}

fn expand_tabs(text: &str) -> Cow<'_, str> {
    if text.contains('\t') {
        Cow::Owned(text.replace('\t', &" ".repeat(TAB_WIDTH)))
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use ratatui::{Terminal, backend::TestBackend};
    use tails_logs::{SearchController, SessionOptions};

    use crate::app::NoticeLevel;

    fn session_with(lines: &[&str]) -> LogSession {
        let options = SessionOptions {
            warmup: Duration::ZERO,
            ..SessionOptions::default()
        };
        let mut session = LogSession::new(options, Instant::now());
        for line in lines {
            session.ingest(line.to_string(), Instant::now());
        }
        session
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let area = buffer.area;
        let mut text = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_styled_line_colors_and_tabs() {
        let rules = RuleSet::builtin();
        let line = styled_line("boot ok\tthen error", &rules, None);

        let texts: Vec<&str> = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(texts.concat(), "boot ok    then error");

        let error = line.spans.iter().find(|s| s.content == "error").unwrap();
        assert_eq!(error.style.fg, Some(Theme::TAG_ERROR));
    }

    #[test]
    fn test_styled_line_search_highlight() {
        let rules = RuleSet::builtin();
        let pattern = SearchPattern::new("disk").unwrap();
        let line = styled_line("disk error", &rules, pattern.as_ref());

        let disk = line.spans.iter().find(|s| s.content == "disk").unwrap();
        assert_eq!(disk.style.bg, Some(Color::Yellow));
    }

    #[test]
    fn test_render_shows_lines_and_state() {
        let session = session_with(&["first line", "second error line"]);
        let mut state = AppState::new(
            "app.log",
            RuleSet::builtin(),
            SearchController::new(Duration::from_millis(10)),
        );
        state.notify(NoticeLevel::Info, "copied 2 lines");

        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        terminal
            .draw(|frame| LogViewerScreen::render(frame, &mut state, &session))
            .unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("app.log"));
        assert!(text.contains("live"));
        assert!(text.contains("second error line"));
        assert!(text.contains("copied 2 lines"));
        assert!(text.contains("Logs (2)"));
    }

    #[test]
    fn test_render_filters_by_settled_query() {
        let session = session_with(&["alpha", "beta", "alphabet"]);
        let mut search = SearchController::new(Duration::from_millis(10));
        search.restore("alpha");
        let mut state = AppState::new("app.log", RuleSet::builtin(), search);

        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        terminal
            .draw(|frame| LogViewerScreen::render(frame, &mut state, &session))
            .unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Logs (2 matching 'alpha')"));
        assert!(!text.contains("beta "));
    }
}
