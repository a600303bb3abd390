mod log_viewer;

pub use log_viewer::{LogViewerScreen, styled_line};
