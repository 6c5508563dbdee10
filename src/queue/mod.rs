// Play queue - tracks the user lined up explicitly
// Consulted before the playlist/mode selector whenever it is non-empty

use crate::library::Track;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_CAPACITY: usize = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },
}

/// FIFO of pending tracks with front insertion for "play this again next".
///
/// Never touches playback state on its own.
#[derive(Debug, Clone)]
pub struct PlaybackQueue {
    tracks: VecDeque<Arc<Track>>,
    capacity: usize,
}

impl PlaybackQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            tracks: VecDeque::new(),
            capacity,
        }
    }

    /// Appends unless the queue is full.
    pub fn add(&mut self, track: Arc<Track>) -> bool {
        if self.tracks.len() >= self.capacity {
            return false;
        }
        self.tracks.push_back(track);
        true
    }

    /// Pushes to the front. Not subject to the capacity limit: it only ever
    /// re-queues what is already playing.
    pub fn insert(&mut self, track: Arc<Track>) {
        self.tracks.push_front(track);
    }

    pub fn pop(&mut self) -> Option<Arc<Track>> {
        self.tracks.pop_front()
    }

    pub fn remove(&mut self, index: usize) -> Result<Arc<Track>, QueueError> {
        let len = self.tracks.len();
        self.tracks
            .remove(index)
            .ok_or(QueueError::OutOfRange { index, len })
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Ordered copy for rendering; does not consume anything.
    pub fn contents(&self) -> Vec<Arc<Track>> {
        self.tracks.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.tracks.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(uri: &str) -> Arc<Track> {
        Arc::new(Track::new(uri))
    }

    fn uris(queue: &PlaybackQueue) -> Vec<String> {
        queue.contents().iter().map(|t| t.uri.clone()).collect()
    }

    #[test]
    fn test_pop_is_fifo() {
        let mut queue = PlaybackQueue::default();
        assert!(queue.add(track("t1")));
        assert!(queue.add(track("t2")));

        assert_eq!(queue.pop().map(|t| t.uri.clone()), Some("t1".to_string()));
        assert_eq!(queue.pop().map(|t| t.uri.clone()), Some("t2".to_string()));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_insert_jumps_the_line() {
        let mut queue = PlaybackQueue::default();
        queue.add(track("t1"));
        queue.add(track("t2"));
        queue.insert(track("t3"));

        assert_eq!(queue.pop().map(|t| t.uri.clone()), Some("t3".to_string()));
        assert_eq!(uris(&queue), vec!["t1", "t2"]);
    }

    #[test]
    fn test_add_rejects_when_full() {
        let mut queue = PlaybackQueue::new(2);
        assert!(queue.add(track("a")));
        assert!(queue.add(track("b")));
        assert!(queue.is_full());
        assert!(!queue.add(track("c")));
        assert_eq!(uris(&queue), vec!["a", "b"]);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut queue = PlaybackQueue::default();
        queue.add(track("a"));
        queue.add(track("b"));

        assert_eq!(queue.remove(2), Err(QueueError::OutOfRange { index: 2, len: 2 }));
        assert_eq!(queue.remove(0).map(|t| t.uri.clone()), Ok("a".to_string()));
        assert_eq!(uris(&queue), vec!["b"]);
    }

    #[test]
    fn test_is_empty_tracks_every_drain_path() {
        let mut queue = PlaybackQueue::default();
        assert!(queue.is_empty());

        queue.add(track("a"));
        assert!(!queue.is_empty());
        queue.pop();
        assert!(queue.is_empty());

        queue.insert(track("a"));
        assert!(!queue.is_empty());
        queue.remove(0).unwrap();
        assert!(queue.is_empty());

        queue.add(track("a"));
        queue.add(track("b"));
        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_contents_is_a_snapshot() {
        let mut queue = PlaybackQueue::default();
        queue.add(track("a"));
        let snapshot = queue.contents();
        queue.clear();
        assert_eq!(snapshot.len(), 1);
    }
}
