use super::Track;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistKind {
    Leaf,
    /// Container only - holds no tracks, just an open/closed flag.
    Folder { open: bool },
}

/// Named, index-addressable sequence of tracks.
///
/// Track order is stable. Indexes handed out earlier may be stale after a
/// removal, so callers go through `track()` which checks bounds.
#[derive(Debug, Clone)]
pub struct Playlist {
    name: String,
    tracks: Vec<Arc<Track>>,
    kind: PlaylistKind,
    parent: Option<String>,
}

impl Playlist {
    pub fn new(name: impl Into<String>, tracks: Vec<Arc<Track>>) -> Self {
        Self {
            name: name.into(),
            tracks,
            kind: PlaylistKind::Leaf,
            parent: None,
        }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: Vec::new(),
            kind: PlaylistKind::Folder { open: false },
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn kind(&self) -> PlaylistKind {
        self.kind
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, PlaylistKind::Folder { .. })
    }

    pub fn is_open(&self) -> bool {
        matches!(self.kind, PlaylistKind::Folder { open: true })
    }

    /// Flips a folder between open and closed. Returns false for leaves.
    pub fn toggle_open(&mut self) -> bool {
        match &mut self.kind {
            PlaylistKind::Folder { open } => {
                *open = !*open;
                debug!("Folder '{}' is now {}", self.name, if *open { "open" } else { "closed" });
                true
            }
            PlaylistKind::Leaf => false,
        }
    }

    pub fn tracks(&self) -> &[Arc<Track>] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Option<&Arc<Track>> {
        self.tracks.get(index)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn remove_track(&mut self, index: usize) -> Option<Arc<Track>> {
        if index < self.tracks.len() {
            Some(self.tracks.remove(index))
        } else {
            None
        }
    }

    pub fn remove_all_tracks(&mut self) {
        self.tracks.clear();
    }

    /// Lines for the tracks view: `"1. Artist - Title"`.
    pub fn track_lines(&self) -> Vec<String> {
        self.tracks
            .iter()
            .enumerate()
            .map(|(i, track)| format!("{}. {}", i + 1, track))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str) -> Arc<Track> {
        Arc::new(Track::new(title).with_artist("Artist").with_title(title))
    }

    #[test]
    fn test_track_lines_are_one_based() {
        let playlist = Playlist::new("mix", vec![track("a"), track("b")]);
        assert_eq!(playlist.track_lines(), vec!["1. Artist - a", "2. Artist - b"]);
    }

    #[test]
    fn test_remove_track_checks_bounds() {
        let mut playlist = Playlist::new("mix", vec![track("a"), track("b")]);
        assert!(playlist.remove_track(5).is_none());
        assert_eq!(playlist.remove_track(0).map(|t| t.uri.clone()), Some("a".to_string()));
        assert_eq!(playlist.len(), 1);
        assert!(playlist.track(1).is_none());
    }

    #[test]
    fn test_only_folders_toggle() {
        let mut leaf = Playlist::new("leaf", Vec::new());
        assert!(!leaf.toggle_open());

        let mut folder = Playlist::folder("rock");
        assert!(!folder.is_open());
        assert!(folder.toggle_open());
        assert!(folder.is_open());
        folder.toggle_open();
        assert!(!folder.is_open());
    }
}
