use keymap::KeyMap;

#[derive(KeyMap, Clone, Copy, Debug, PartialEq)]
pub enum Action {
    /// Quit the application
    #[key("q")]
    Quit,
    /// Reset the machine to its initial tape and state
    #[key("r")]
    Reset,
    /// Advance the machine by one step
    #[key("space")]
    Step,
    /// Start or pause automatic stepping
    #[key("p")]
    ToggleRun,
    /// Toggle help display
    #[key("h")]
    ToggleHelp,
    /// Load the previous preset
    #[key("left")]
    PreviousPreset,
    /// Load the next preset
    #[key("right")]
    NextPreset,
    /// Shorten the step interval
    #[key("f")]
    SpeedUp,
    /// Lengthen the step interval
    #[key("s")]
    SlowDown,
}
