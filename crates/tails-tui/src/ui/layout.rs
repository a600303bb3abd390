use ratatui::layout::{Constraint, Direction, Layout as RatatuiLayout, Rect};

/// Layout helper for consistent screen layouts
pub struct Layout;

/// Areas of the log viewer screen
pub struct ViewerAreas {
    pub header: Rect,
    pub search: Option<Rect>,
    pub logs: Rect,
    pub status: Rect,
}

impl Layout {
    /// Header, optional search bar, log pane and status bar, top to bottom
    pub fn viewer(area: Rect, show_search: bool) -> ViewerAreas {
        let mut constraints = vec![Constraint::Length(3)]; // Header
        if show_search {
            constraints.push(Constraint::Length(3)); // Search bar
        }
        constraints.push(Constraint::Min(1)); // Logs
        constraints.push(Constraint::Length(1)); // Status bar

        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        if show_search {
            ViewerAreas {
                header: chunks[0],
                search: Some(chunks[1]),
                logs: chunks[2],
                status: chunks[3],
            }
        } else {
            ViewerAreas {
                header: chunks[0],
                search: None,
                logs: chunks[1],
                status: chunks[2],
            }
        }
    }

    /// A centered popup of at most `width` x `height`
    pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
        let width = width.min(area.width.saturating_sub(4));
        let height = height.min(area.height.saturating_sub(4));
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        Rect::new(x, y, width, height)
    }
}
