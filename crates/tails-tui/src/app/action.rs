/// All possible actions in the application (command pattern)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    ToggleHelp,
    DismissNotice,

    // Search bar
    OpenSearch,
    ApplySearch,
    CloseSearch,
    SearchInput(char),
    SearchBackspace,
    SearchClear,

    // Log pane
    ScrollUp(usize),
    ScrollDown(usize),
    PageUp,
    PageDown,
    ScrollToTop,
    ScrollToBottom,
    ToggleAutoScroll,
    ClearLogs,
    CopyAll,
}
