use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use crate::app::Notice;
use crate::ui::Theme;

/// Status bar showing keyboard shortcuts, or a notice when one is pending
pub struct StatusBar<'a> {
    hints: Vec<(&'a str, &'a str)>,
    notice: Option<&'a Notice>,
    right_text: Option<String>,
}

impl<'a> StatusBar<'a> {
    pub fn new() -> Self {
        Self {
            hints: Vec::new(),
            notice: None,
            right_text: None,
        }
    }

    /// Add keyboard hints as (key, description) pairs
    pub fn hints<I>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.hints = hints.into_iter().collect();
        self
    }

    /// Show a notice in place of the hints
    pub fn notice(mut self, notice: Option<&'a Notice>) -> Self {
        self.notice = notice;
        self
    }

    /// Set text to display on the right side
    pub fn right<S: Into<String>>(mut self, text: S) -> Self {
        self.right_text = Some(text.into());
        self
    }
}

impl Default for StatusBar<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, Theme::status_bar());

        let line = match self.notice {
            Some(notice) => Line::from(vec![
                Span::styled(notice.text.clone(), Theme::notice(notice.level)),
                Span::styled("  [Esc] dismiss", Theme::status_bar()),
            ]),
            None => {
                let mut spans = Vec::new();
                for (i, (key, desc)) in self.hints.iter().enumerate() {
                    if i > 0 {
                        spans.push(Span::styled("  ", Theme::status_bar()));
                    }
                    spans.push(Span::styled(format!("[{}]", key), Theme::status_bar_key()));
                    spans.push(Span::styled(format!(" {}", desc), Theme::status_bar()));
                }
                Line::from(spans)
            }
        };
        let line_width = line.width() as u16;

        buf.set_line(area.x + 1, area.y, &line, area.width.saturating_sub(2));

        if let Some(right) = self.right_text {
            let right_width = right.width() as u16;
            let right_x = area.x + area.width.saturating_sub(right_width + 1);
            if right_x > area.x + line_width + 2 {
                let right_span = Span::styled(right, Theme::status_bar());
                buf.set_span(right_x, area.y, &right_span, right_width);
            }
        }
    }
}

/// Hints for the log pane
pub fn log_viewer_hints() -> Vec<(&'static str, &'static str)> {
    vec![
        ("/", "Search"),
        ("f", "Follow"),
        ("y", "Copy all"),
        ("c", "Clear"),
        ("?", "Help"),
        ("q", "Quit"),
    ]
}

/// Hints while the search bar is focused
pub fn search_hints() -> Vec<(&'static str, &'static str)> {
    vec![("Enter", "Apply"), ("Esc", "Clear"), ("Ctrl+u", "Erase")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::NoticeLevel;

    fn rendered(bar: StatusBar, width: u16) -> String {
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        bar.render(area, &mut buf);
        (0..width)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_hints_and_right_text() {
        let text = rendered(
            StatusBar::new().hints([("q", "Quit")]).right("3 lines"),
            40,
        );
        assert!(text.contains("[q] Quit"));
        assert!(text.trim_end().ends_with("3 lines"));
    }

    #[test]
    fn test_notice_replaces_hints() {
        let notice = Notice {
            level: NoticeLevel::Warning,
            text: "another viewer took over".to_string(),
        };
        let text = rendered(
            StatusBar::new()
                .hints([("q", "Quit")])
                .notice(Some(&notice)),
            60,
        );
        assert!(text.contains("another viewer took over"));
        assert!(!text.contains("[q] Quit"));
    }
}
