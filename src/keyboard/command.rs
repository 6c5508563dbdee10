use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Semantic commands a key sequence can be bound to. The string names are
/// the ones used in the key-mapping file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    PauseTrack,
    ShuffleMode,
    ShuffleAllMode,
    NextTrack,
    ReplayTrack,
    Search,
    Quit,
    QueueTrack,
    QueuePlaylist,
    RepeatPlayingTrack,
    RemoveTrack,
    RemoveAllTracks,
    GoToFirstLine,
    GoToLastLine,
    PageUp,
    PageDown,
    PlaySelectedTrack,
    Up,
    Down,
    Left,
    Right,
    OpenCloseFolder,
    ArtistAlbums,
    CreatePlaylist,
}

impl Command {
    pub const ALL: [Command; 24] = [
        Command::PauseTrack,
        Command::ShuffleMode,
        Command::ShuffleAllMode,
        Command::NextTrack,
        Command::ReplayTrack,
        Command::Search,
        Command::Quit,
        Command::QueueTrack,
        Command::QueuePlaylist,
        Command::RepeatPlayingTrack,
        Command::RemoveTrack,
        Command::RemoveAllTracks,
        Command::GoToFirstLine,
        Command::GoToLastLine,
        Command::PageUp,
        Command::PageDown,
        Command::PlaySelectedTrack,
        Command::Up,
        Command::Down,
        Command::Left,
        Command::Right,
        Command::OpenCloseFolder,
        Command::ArtistAlbums,
        Command::CreatePlaylist,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Command::PauseTrack => "PauseTrack",
            Command::ShuffleMode => "ShuffleMode",
            Command::ShuffleAllMode => "ShuffleAllMode",
            Command::NextTrack => "NextTrack",
            Command::ReplayTrack => "ReplayTrack",
            Command::Search => "Search",
            Command::Quit => "Quit",
            Command::QueueTrack => "QueueTrack",
            Command::QueuePlaylist => "QueuePlaylist",
            Command::RepeatPlayingTrack => "RepeatPlayingTrack",
            Command::RemoveTrack => "RemoveTrack",
            Command::RemoveAllTracks => "RemoveAllTracks",
            Command::GoToFirstLine => "GoToFirstLine",
            Command::GoToLastLine => "GoToLastLine",
            Command::PageUp => "PageUp",
            Command::PageDown => "PageDown",
            Command::PlaySelectedTrack => "PlaySelectedTrack",
            Command::Up => "Up",
            Command::Down => "Down",
            Command::Left => "Left",
            Command::Right => "Right",
            Command::OpenCloseFolder => "OpenCloseFolder",
            Command::ArtistAlbums => "ArtistAlbums",
            Command::CreatePlaylist => "CreatePlaylist",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown command '{0}'")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .iter()
            .copied()
            .find(|command| command.name() == s)
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for command in Command::ALL {
            assert_eq!(command.name().parse::<Command>(), Ok(command));
        }
        assert!("Dance".parse::<Command>().is_err());
    }
}
