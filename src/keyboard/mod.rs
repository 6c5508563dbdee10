// Keyboard handling - raw keys in, semantic commands out
// Bindings are scoped per view, so the same key can mean different things

pub mod command;
pub mod dispatcher;
pub mod key;
pub mod keymap;

pub use command::{Command, UnknownCommand};
pub use dispatcher::{Dispatch, DispatchState, Dispatcher, Prompt, Typed};
pub use key::{parse_sequence, Key, KeySequence};
pub use keymap::{KeyEntry, KeyMap, KeyMapBuilder};

/// The panels that scope key bindings. `Status` is the text-input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum View {
    #[default]
    Playlists,
    Tracks,
    Queue,
    Status,
}

impl View {
    /// Views that take list commands, in binding registration order.
    pub const LISTS: [View; 3] = [View::Tracks, View::Playlists, View::Queue];

    /// Focus to the right: playlists -> tracks -> queue.
    pub fn right(self) -> View {
        match self {
            View::Playlists => View::Tracks,
            View::Tracks => View::Queue,
            other => other,
        }
    }

    /// Focus to the left: queue -> tracks -> playlists.
    pub fn left(self) -> View {
        match self {
            View::Queue => View::Tracks,
            View::Tracks => View::Playlists,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_moves_between_list_views() {
        assert_eq!(View::Playlists.right(), View::Tracks);
        assert_eq!(View::Tracks.right(), View::Queue);
        assert_eq!(View::Queue.right(), View::Queue);
        assert_eq!(View::Queue.left(), View::Tracks);
        assert_eq!(View::Playlists.left(), View::Playlists);
        assert_eq!(View::Status.left(), View::Status);
    }
}
