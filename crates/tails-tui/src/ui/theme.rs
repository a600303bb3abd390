use ratatui::style::{Color, Modifier, Style};

use tails_logs::GateState;
use tails_types::SEARCH_HIGHLIGHT;

use crate::app::NoticeLevel;

/// Color theme for the application
pub struct Theme;

impl Theme {
    // Base colors
    pub const BG: Color = Color::Reset;
    pub const FG: Color = Color::White;
    pub const FG_DIM: Color = Color::DarkGray;

    // Accent colors
    pub const PRIMARY: Color = Color::Cyan;
    pub const HIGHLIGHT: Color = Color::Yellow;

    // Status colors
    pub const SUCCESS: Color = Color::Green;
    pub const WARNING: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;

    // Rule tag colors
    pub const TAG_INFO: Color = Color::Blue;
    pub const TAG_NOTICE: Color = Color::Cyan;
    pub const TAG_SUCCESS: Color = Color::Green;
    pub const TAG_NOTIFICATION: Color = Color::Rgb(245, 158, 11);
    pub const TAG_ADDRESS: Color = Color::LightMagenta;
    pub const TAG_WARNING: Color = Color::Yellow;
    pub const TAG_ERROR: Color = Color::Red;

    /// Style for a span tag. Unknown tags (and the plain tag) use the base text style.
    pub fn for_tag(tag: &str) -> Style {
        let fg = match tag {
            SEARCH_HIGHLIGHT => return Self::search_highlight(),
            "info" => Self::TAG_INFO,
            "notice" => Self::TAG_NOTICE,
            "success" => Self::TAG_SUCCESS,
            "notification" => Self::TAG_NOTIFICATION,
            "address" => Self::TAG_ADDRESS,
            "warning" => Self::TAG_WARNING,
            "error" => Self::TAG_ERROR,
            _ => Self::FG,
        };
        Style::default().fg(fg)
    }

    pub fn search_highlight() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Self::HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn gate_state(state: GateState) -> Style {
        let fg = match state {
            GateState::Warming => Self::WARNING,
            GateState::Open => Self::SUCCESS,
            GateState::Closed => Self::ERROR,
        };
        Style::default().fg(fg).add_modifier(Modifier::BOLD)
    }

    pub fn notice(level: NoticeLevel) -> Style {
        let fg = match level {
            NoticeLevel::Info => Self::PRIMARY,
            NoticeLevel::Warning => Self::WARNING,
            NoticeLevel::Error => Self::ERROR,
        };
        Style::default()
            .fg(fg)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    }

    // Border styles
    pub fn border() -> Style {
        Style::default().fg(Self::FG_DIM)
    }

    pub fn border_focused() -> Style {
        Style::default().fg(Self::HIGHLIGHT)
    }

    // Text styles
    pub fn title() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text() -> Style {
        Style::default().fg(Self::FG)
    }

    pub fn text_dim() -> Style {
        Style::default().fg(Self::FG_DIM)
    }

    pub fn text_highlight() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    // Status bar
    pub fn status_bar() -> Style {
        Style::default().fg(Self::FG).bg(Color::DarkGray)
    }

    pub fn status_bar_key() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_tag() {
        assert_eq!(Theme::for_tag("error").fg, Some(Theme::TAG_ERROR));
        assert_eq!(Theme::for_tag("").fg, Some(Theme::FG));
        assert_eq!(Theme::for_tag("custom").fg, Some(Theme::FG));
    }

    #[test]
    fn test_search_highlight_is_bold_on_yellow() {
        let style = Theme::for_tag(SEARCH_HIGHLIGHT);
        assert_eq!(style.bg, Some(Color::Yellow));
        assert!(style.add_modifier.contains(Modifier::BOLD));
    }
}
