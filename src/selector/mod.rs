// Playback mode selector - decides what plays when the queue is empty
// Pure function of (collection, cursor, mode); the only state is the RNG

use crate::library::{PlaybackMode, PlaylistCollection};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Position used to resume sequential traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub playlist: String,
    pub index: usize,
}

impl Cursor {
    pub fn new(playlist: impl Into<String>, index: usize) -> Self {
        Self {
            playlist: playlist.into(),
            index,
        }
    }
}

pub struct Selector<R = StdRng> {
    rng: R,
}

impl Selector<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for Selector<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Selector<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Next `(playlist, index)` under the collection's current mode.
    ///
    /// Track counts are read at call time, never cached. Returns `None` when
    /// nothing playable exists: the cursor's playlist is gone or empty, or in
    /// `ShuffleAll` every playlist is empty.
    ///
    /// Shuffle keeps no history, so picking the same track twice in a row is
    /// a legitimate outcome.
    pub fn next(&mut self, collection: &PlaylistCollection, cursor: &Cursor) -> Option<Cursor> {
        match collection.mode() {
            PlaybackMode::Sequential => {
                let len = collection.get(&cursor.playlist)?.len();
                if len == 0 {
                    return None;
                }
                Some(Cursor::new(cursor.playlist.clone(), next_sequential(cursor.index, len)))
            }
            PlaybackMode::Shuffle => {
                let len = collection.get(&cursor.playlist)?.len();
                if len == 0 {
                    return None;
                }
                Some(Cursor::new(cursor.playlist.clone(), self.rng.gen_range(0..len)))
            }
            PlaybackMode::ShuffleAll => self.any_playlist(collection),
        }
    }

    fn any_playlist(&mut self, collection: &PlaylistCollection) -> Option<Cursor> {
        let candidates: Vec<(&str, usize)> = collection
            .names()
            .iter()
            .filter_map(|name| collection.get(name))
            .filter(|playlist| !playlist.is_folder() && !playlist.is_empty())
            .map(|playlist| (playlist.name(), playlist.len()))
            .collect();

        if candidates.is_empty() {
            return None;
        }

        let (name, len) = candidates[self.rng.gen_range(0..candidates.len())];
        Some(Cursor::new(name, self.rng.gen_range(0..len)))
    }
}

/// Wraps to the first track after the last one. A stale index past the end
/// also restarts at 0.
pub fn next_sequential(index: usize, len: usize) -> usize {
    if index + 1 >= len {
        0
    } else {
        index + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{Playlist, Track};
    use std::sync::Arc;

    fn playlist(name: &str, count: usize) -> Playlist {
        let tracks = (0..count)
            .map(|i| Arc::new(Track::new(format!("{}-{}", name, i))))
            .collect();
        Playlist::new(name, tracks)
    }

    fn seeded() -> Selector<StdRng> {
        Selector::with_rng(StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_sequential_advances_and_wraps() {
        let collection = PlaylistCollection::from_playlists(vec![playlist("a", 4)]);
        let mut selector = seeded();

        for i in 0..4 {
            let next = selector.next(&collection, &Cursor::new("a", i)).unwrap();
            assert_eq!(next, Cursor::new("a", (i + 1) % 4));
        }
    }

    #[test]
    fn test_sequential_rereads_resized_playlist() {
        let mut collection = PlaylistCollection::from_playlists(vec![playlist("a", 4)]);
        let mut selector = seeded();

        collection.get_mut("a").unwrap().remove_track(3);
        collection.get_mut("a").unwrap().remove_track(2);
        let next = selector.next(&collection, &Cursor::new("a", 3)).unwrap();
        assert_eq!(next.index, 0);
    }

    #[test]
    fn test_empty_or_missing_playlist_selects_nothing() {
        let collection = PlaylistCollection::from_playlists(vec![playlist("empty", 0)]);
        let mut selector = seeded();

        assert!(selector.next(&collection, &Cursor::new("empty", 0)).is_none());
        assert!(selector.next(&collection, &Cursor::new("gone", 0)).is_none());
    }

    #[test]
    fn test_shuffle_stays_in_playlist_and_range() {
        let mut collection = PlaylistCollection::from_playlists(vec![playlist("a", 5), playlist("b", 9)]);
        collection.set_mode(PlaybackMode::Shuffle);
        let mut selector = seeded();

        for _ in 0..200 {
            let next = selector.next(&collection, &Cursor::new("a", 0)).unwrap();
            assert_eq!(next.playlist, "a");
            assert!(next.index < 5);
        }
    }

    #[test]
    fn test_shuffle_all_never_picks_empty_playlist() {
        let mut collection = PlaylistCollection::from_playlists(vec![playlist("empty", 0), playlist("full", 3)]);
        collection.set_mode(PlaybackMode::ShuffleAll);
        let mut selector = seeded();

        for _ in 0..1000 {
            let next = selector.next(&collection, &Cursor::new("empty", 0)).unwrap();
            assert_eq!(next.playlist, "full");
            assert!(next.index < 3);
        }
    }

    #[test]
    fn test_shuffle_all_reaches_every_playlist() {
        let mut collection = PlaylistCollection::from_playlists(vec![playlist("a", 2), playlist("b", 2), playlist("c", 2)]);
        collection.set_mode(PlaybackMode::ShuffleAll);
        let mut selector = seeded();

        let mut seen = std::collections::HashSet::new();
        for _ in 0..300 {
            seen.insert(selector.next(&collection, &Cursor::new("a", 0)).unwrap().playlist);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_shuffle_all_with_only_empty_playlists() {
        let mut collection = PlaylistCollection::from_playlists(vec![playlist("a", 0), Playlist::folder("f")]);
        collection.set_mode(PlaybackMode::ShuffleAll);
        assert!(seeded().next(&collection, &Cursor::new("a", 0)).is_none());
    }
}
