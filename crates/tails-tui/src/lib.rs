//! Terminal UI for tails
//!
//! This crate provides the terminal user interface: application state,
//! keybindings, event handling and the log viewer screen.

pub mod app;
pub mod config;
pub mod tui;
pub mod ui;

pub use app::{Action, AppState, Notice, NoticeLevel, UiState};
pub use config::{KeyBinding, KeyBindings, KeyContext};
pub use tui::{Event, EventHandler, Tui};
pub use ui::components::{HelpOverlay, StatusBar};
pub use ui::screens::{LogViewerScreen, styled_line};
pub use ui::{Layout, Theme};
