/// Everything a key press can ask the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Random,
    Back,
    NextDirectory,
    PrevDirectory,
    ToggleShuffle,
    TogglePause,
    Slower,
    Faster,
    DeleteCurrent,
    DeleteDirectory,
    Reload,
    ToggleFullscreen,
    ToggleZoom,
    Quit,
}

/// The independent timers the session owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    /// Auto-advance to the next slide.
    Advance,
    /// Next frame of the animation on screen.
    Frame,
    /// Debounced re-render after the window stopped resizing.
    Resize,
    /// Debounced reload after the file system changed.
    Rescan,
}

/// Whether the event loop should keep running after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Events delivered to the viewer from outside the window system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerEvent {
    /// Images were added, removed or renamed under a watched root.
    LibraryChanged,
}
