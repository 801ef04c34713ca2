//! Input symbol to [`Command`] table.

use winit::keyboard::{Key, ModifiersState, NamedKey};

use crate::events::Command;

/// Resolve a logical key (with modifiers) to a command.
#[must_use]
pub fn command_for(key: &Key, modifiers: ModifiersState) -> Option<Command> {
    match key {
        Key::Named(named) => named_command(*named, modifiers),
        Key::Character(text) => char_command(text.as_str()),
        _ => None,
    }
}

/// Whether holding the key down may repeat `cmd`. Deletes, toggles, reload
/// and quit fire once per physical press.
#[must_use]
pub fn accepts_repeat(cmd: Command) -> bool {
    matches!(
        cmd,
        Command::Next
            | Command::Prev
            | Command::Random
            | Command::NextDirectory
            | Command::PrevDirectory
            | Command::Slower
            | Command::Faster
    )
}

fn named_command(key: NamedKey, modifiers: ModifiersState) -> Option<Command> {
    let cmd = match key {
        NamedKey::ArrowRight | NamedKey::Enter => Command::Next,
        NamedKey::ArrowLeft => Command::Prev,
        NamedKey::ArrowDown | NamedKey::PageDown => Command::NextDirectory,
        NamedKey::ArrowUp | NamedKey::PageUp => Command::PrevDirectory,
        NamedKey::Space => Command::TogglePause,
        NamedKey::Backspace => Command::Back,
        NamedKey::Delete if modifiers.shift_key() => Command::DeleteDirectory,
        NamedKey::Delete => Command::DeleteCurrent,
        NamedKey::F5 => Command::Reload,
        NamedKey::F11 => Command::ToggleFullscreen,
        NamedKey::Escape => Command::Quit,
        _ => return None,
    };
    Some(cmd)
}

fn char_command(text: &str) -> Option<Command> {
    let cmd = match text {
        "z" => Command::Random,
        "q" => Command::ToggleShuffle,
        " " => Command::TogglePause,
        "+" | "=" => Command::Slower,
        "-" => Command::Faster,
        "r" => Command::Reload,
        "f" => Command::ToggleFullscreen,
        "x" => Command::ToggleZoom,
        _ => return None,
    };
    Some(cmd)
}
