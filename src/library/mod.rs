// Library model - tracks, playlists and the collection the player walks through
// Populated once by the backend session, then mutated in place for the session

pub mod playlist;
pub mod track;

pub use playlist::{Playlist, PlaylistKind};
pub use track::Track;

use std::collections::HashMap;
use std::fmt;

/// Next-track policy. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    Sequential,
    /// Random track within the current playlist.
    Shuffle,
    /// Random playlist, then a random track within it.
    ShuffleAll,
}

impl PlaybackMode {
    /// Prefix shown in front of the status line.
    pub fn status_prefix(&self) -> &'static str {
        match self {
            PlaybackMode::Sequential => "",
            PlaybackMode::Shuffle => "[Shuffle] ",
            PlaybackMode::ShuffleAll => "[Shuffle all] ",
        }
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackMode::Sequential => "sequential",
            PlaybackMode::Shuffle => "shuffle",
            PlaybackMode::ShuffleAll => "shuffle all",
        };
        f.write_str(name)
    }
}

/// One line of the playlists view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub name: String,
    pub depth: usize,
    pub kind: PlaylistKind,
}

impl PlaylistEntry {
    pub fn label(&self) -> String {
        let indent = "  ".repeat(self.depth);
        match self.kind {
            PlaylistKind::Folder { open: true } => format!("{}[-] {}", indent, self.name),
            PlaylistKind::Folder { open: false } => format!("{}[+] {}", indent, self.name),
            PlaylistKind::Leaf => format!("{}{}", indent, self.name),
        }
    }
}

/// Playlists keyed by unique name, plus the active playback mode.
///
/// `names` is kept sorted and rebuilt on every insert/remove so random
/// selection never depends on `HashMap` iteration order.
#[derive(Debug, Clone, Default)]
pub struct PlaylistCollection {
    playlists: HashMap<String, Playlist>,
    names: Vec<String>,
    mode: PlaybackMode,
}

impl PlaylistCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_playlists(playlists: impl IntoIterator<Item = Playlist>) -> Self {
        let mut collection = Self::new();
        for playlist in playlists {
            collection.playlists.insert(playlist.name().to_string(), playlist);
        }
        collection.rebuild_names();
        collection
    }

    /// Inserts or replaces by name.
    pub fn insert(&mut self, playlist: Playlist) {
        self.playlists.insert(playlist.name().to_string(), playlist);
        self.rebuild_names();
    }

    /// Takes every playlist from `other`, replacing same-named ones.
    /// The receiving collection keeps its own mode.
    pub fn merge(&mut self, other: PlaylistCollection) {
        for (name, playlist) in other.playlists {
            self.playlists.insert(name, playlist);
        }
        self.rebuild_names();
    }

    pub fn remove(&mut self, name: &str) -> Option<Playlist> {
        let removed = self.playlists.remove(name);
        if removed.is_some() {
            self.rebuild_names();
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<&Playlist> {
        self.playlists.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Playlist> {
        self.playlists.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.playlists.contains_key(name)
    }

    /// Every playlist name, sorted.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.playlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        self.mode = mode;
    }

    /// Selecting the active mode falls back to `Sequential`; selecting any
    /// other mode replaces the active one.
    pub fn toggle_mode(&mut self, mode: PlaybackMode) -> PlaybackMode {
        self.mode = if self.mode == mode { PlaybackMode::Sequential } else { mode };
        self.mode
    }

    /// Visible lines of the playlists view: top-level entries sorted by name,
    /// each open folder followed by its children.
    pub fn entries(&self) -> Vec<PlaylistEntry> {
        let mut entries = Vec::with_capacity(self.names.len());
        for name in &self.names {
            let Some(playlist) = self.playlists.get(name) else { continue };
            let has_live_parent = playlist.parent().is_some_and(|p| self.playlists.contains_key(p));
            if !has_live_parent {
                self.push_entry(playlist, 0, &mut entries);
            }
        }
        entries
    }

    fn push_entry(&self, playlist: &Playlist, depth: usize, entries: &mut Vec<PlaylistEntry>) {
        entries.push(PlaylistEntry {
            name: playlist.name().to_string(),
            depth,
            kind: playlist.kind(),
        });

        if playlist.is_open() {
            for name in &self.names {
                if let Some(child) = self.playlists.get(name) {
                    if child.parent() == Some(playlist.name()) {
                        self.push_entry(child, depth + 1, entries);
                    }
                }
            }
        }
    }

    fn rebuild_names(&mut self) {
        self.names = self.playlists.keys().cloned().collect();
        self.names.sort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn playlist(name: &str, count: usize) -> Playlist {
        let tracks = (0..count)
            .map(|i| Arc::new(Track::new(format!("{}-{}", name, i))))
            .collect();
        Playlist::new(name, tracks)
    }

    #[test]
    fn test_names_are_sorted_and_rebuilt() {
        let mut collection = PlaylistCollection::from_playlists(vec![playlist("b", 1), playlist("a", 1)]);
        assert_eq!(collection.names(), &["a".to_string(), "b".to_string()]);

        collection.insert(playlist("0", 2));
        assert_eq!(collection.names()[0], "0");

        collection.remove("a");
        assert_eq!(collection.names(), &["0".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_modes_are_mutually_exclusive() {
        let mut collection = PlaylistCollection::new();
        assert_eq!(collection.mode(), PlaybackMode::Sequential);

        collection.toggle_mode(PlaybackMode::Shuffle);
        assert_eq!(collection.mode(), PlaybackMode::Shuffle);

        collection.toggle_mode(PlaybackMode::ShuffleAll);
        assert_eq!(collection.mode(), PlaybackMode::ShuffleAll);

        collection.toggle_mode(PlaybackMode::ShuffleAll);
        assert_eq!(collection.mode(), PlaybackMode::Sequential);

        collection.set_mode(PlaybackMode::Shuffle);
        collection.set_mode(PlaybackMode::ShuffleAll);
        assert_eq!(collection.mode(), PlaybackMode::ShuffleAll);
    }

    #[test]
    fn test_merge_keeps_mode_and_replaces_by_name() {
        let mut collection = PlaylistCollection::from_playlists(vec![playlist("a", 1)]);
        collection.set_mode(PlaybackMode::Shuffle);

        collection.merge(PlaylistCollection::from_playlists(vec![playlist("a", 3), playlist("*search", 2)]));
        assert_eq!(collection.mode(), PlaybackMode::Shuffle);
        assert_eq!(collection.get("a").map(Playlist::len), Some(3));
        assert!(collection.contains("*search"));
    }

    #[test]
    fn test_entries_hide_children_of_closed_folders() {
        let mut collection = PlaylistCollection::from_playlists(vec![
            Playlist::folder("rock"),
            playlist("rock/live", 1).with_parent("rock"),
            playlist("jazz", 1),
        ]);

        let labels: Vec<String> = collection.entries().iter().map(PlaylistEntry::label).collect();
        assert_eq!(labels, vec!["jazz", "[+] rock"]);

        collection.get_mut("rock").map(Playlist::toggle_open);
        let labels: Vec<String> = collection.entries().iter().map(PlaylistEntry::label).collect();
        assert_eq!(labels, vec!["jazz", "[-] rock", "  rock/live"]);
    }
}
