/// User actions triggered from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Quit application
    Quit,
    /// Scroll content by a step
    ScrollUp,
    ScrollDown,
    /// Scroll content by a page
    PageUp,
    PageDown,
    /// Copy the shown content's source to the clipboard
    CopyContent,
    /// Dismiss banner and call alert
    DismissNotifications,
    /// Retry the display service now instead of waiting
    Reconnect,
}
