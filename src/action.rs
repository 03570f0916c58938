#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    ToggleHelp,
    TogglePause,
    CycleTheme,
    ClearHistory,
    None,
}
