// Player orchestrator - owns what is playing and decides what plays next
// Runs as its own task; everything it knows arrives over the event bus

use crate::events::{Events, PlaybackReport, PlayerInbox, Transport};
use crate::library::{PlaybackMode, Playlist, PlaylistCollection, Track};
use crate::queue::PlaybackQueue;
use crate::selector::{Cursor, Selector};
use anyhow::Result;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing(Arc<Track>),
    Paused(Arc<Track>),
}

impl PlaybackState {
    pub fn current(&self) -> Option<&Arc<Track>> {
        match self {
            PlaybackState::Stopped => None,
            PlaybackState::Playing(track) | PlaybackState::Paused(track) => Some(track),
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, PlaybackState::Paused(_))
    }
}

/// Mutations the UI asks for. Counts are already at least 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    PlaySelected { playlist: String, index: usize },
    QueueTrack { playlist: String, index: usize, count: u32 },
    QueuePlaylist { playlist: String, count: u32 },
    RepeatPlaying { count: u32 },
    RemoveQueued { index: usize, count: u32 },
    ClearQueue,
    ToggleMode(PlaybackMode),
    RemoveTrack { playlist: String, index: usize, count: u32 },
    RemoveAllTracks { playlist: String },
    RemovePlaylist { name: String },
    ToggleFolder { name: String },
    CreatePlaylist { name: String },
}

/// Read-only copy of the player's state for rendering.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub collection: PlaylistCollection,
    pub queue: Vec<Arc<Track>>,
    pub state: PlaybackState,
    pub cursor: Option<Cursor>,
}

impl Snapshot {
    pub fn mode(&self) -> PlaybackMode {
        self.collection.mode()
    }
}

pub fn playing_status(track: &Track) -> String {
    format!("Playing: {} [{}]", track, track.duration_string())
}

pub fn paused_status(track: &Track) -> String {
    format!("Paused: {} [{}]", track, track.duration_string())
}

fn no_track_status(playlist: &str, index: usize) -> String {
    format!("No track {} in '{}'", index + 1, playlist)
}

pub struct Player<R = StdRng> {
    events: Events,
    inbox: PlayerInbox,
    collection: PlaylistCollection,
    queue: PlaybackQueue,
    selector: Selector<R>,
    cursor: Option<Cursor>,
    state: PlaybackState,
    snapshots: watch::Sender<Snapshot>,
}

impl Player<StdRng> {
    pub fn new(events: Events, inbox: PlayerInbox, queue: PlaybackQueue) -> Self {
        Self::with_selector(events, inbox, queue, Selector::new())
    }
}

impl<R: Rng> Player<R> {
    pub fn with_selector(events: Events, inbox: PlayerInbox, queue: PlaybackQueue, selector: Selector<R>) -> Self {
        let (snapshots, _) = watch::channel(Snapshot::default());
        Self {
            events,
            inbox,
            collection: PlaylistCollection::new(),
            queue,
            selector,
            cursor: None,
            state: PlaybackState::Stopped,
            snapshots,
        }
    }

    /// A receiver that always holds the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    /// Services bus signals until shutdown, then returns the final state.
    /// Nothing that arrives after the shutdown latch is handled.
    pub async fn run(mut self) -> Result<Snapshot> {
        info!("Player started");
        self.publish();

        loop {
            tokio::select! {
                biased;
                _ = self.inbox.shutdown.wait() => break,
                Some(collection) = self.inbox.new_playlists.recv() => self.on_new_playlists(collection),
                Some(()) = self.inbox.next_play.recv() => self.play_next(),
                Some(()) = self.inbox.pause.recv() => self.toggle_pause(),
                Some(()) = self.inbox.replay.recv() => self.replay(),
                Some(report) = self.inbox.playback.recv() => self.on_report(report),
                Some(command) = self.inbox.commands.recv() => self.on_command(command),
            }
            self.publish();
        }

        self.state = PlaybackState::Stopped;
        self.publish();
        info!("Player stopped");
        Ok(self.snapshot())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            collection: self.collection.clone(),
            queue: self.queue.contents(),
            state: self.state.clone(),
            cursor: self.cursor.clone(),
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }

    fn on_new_playlists(&mut self, collection: PlaylistCollection) {
        debug!("Merging {} playlists", collection.len());
        self.collection.merge(collection);
    }

    /// Queue first; otherwise the mode selector, starting from the cursor.
    fn play_next(&mut self) {
        if let Some(track) = self.queue.pop() {
            debug!("Next from queue: {}", track);
            self.events.play(track);
            return;
        }

        let Some(cursor) = self.cursor.as_ref() else {
            debug!("NextPlay with no playlist selected");
            return;
        };

        match self.selector.next(&self.collection, cursor) {
            Some(next) => {
                let track = self.track_at(&next.playlist, next.index);
                self.cursor = Some(next);
                if let Some(track) = track {
                    self.events.play(track);
                }
            }
            None => debug!("Nothing to play after {:?}", cursor),
        }
    }

    fn toggle_pause(&mut self) {
        match std::mem::take(&mut self.state) {
            PlaybackState::Playing(track) => {
                self.events.transport(Transport::Pause);
                self.events.set_status(paused_status(&track));
                self.state = PlaybackState::Paused(track);
            }
            PlaybackState::Paused(track) => {
                self.events.transport(Transport::Resume);
                self.events.set_status(playing_status(&track));
                self.state = PlaybackState::Playing(track);
            }
            PlaybackState::Stopped => debug!("Pause ignored: nothing is playing"),
        }
    }

    fn replay(&mut self) {
        match self.state.current() {
            Some(track) => self.events.play(track.clone()),
            None => debug!("Replay ignored: nothing is playing"),
        }
    }

    fn on_report(&mut self, report: PlaybackReport) {
        match report {
            PlaybackReport::Started(track) => {
                self.events.set_status(playing_status(&track));
                self.state = PlaybackState::Playing(track);
            }
            PlaybackReport::Unavailable(track) => {
                warn!("Track not available: {}", track.uri);
                self.events.set_status("Not available");
            }
            PlaybackReport::LoadFailed { track, reason } => {
                warn!("Failed to load {}: {}", track.uri, reason);
                self.events.set_status(format!("Could not play {}: {}", track, reason));
            }
        }
    }

    fn on_command(&mut self, command: PlayerCommand) {
        debug!("Player command {:?}", command);
        match command {
            PlayerCommand::PlaySelected { playlist, index } => match self.track_at(&playlist, index) {
                Some(track) => {
                    self.cursor = Some(Cursor::new(playlist, index));
                    self.events.play(track);
                }
                None => self.events.set_status("No track selected"),
            },
            PlayerCommand::QueueTrack { playlist, index, count } => match self.track_at(&playlist, index) {
                Some(track) => self.enqueue(std::iter::repeat(track).take(count as usize)),
                None => self.events.set_status(no_track_status(&playlist, index)),
            },
            PlayerCommand::QueuePlaylist { playlist, count } => {
                let tracks: Vec<Arc<Track>> = match self.collection.get(&playlist) {
                    Some(playlist) => playlist.tracks().to_vec(),
                    None => return,
                };
                if tracks.is_empty() {
                    self.events.set_status(format!("Playlist '{}' has no tracks", playlist));
                    return;
                }
                // Rounds past the free room would only be rejected
                let room = self.queue.capacity().saturating_sub(self.queue.len());
                let rounds = (count as usize).min(room.div_ceil(tracks.len()) + 1);
                self.enqueue((0..rounds).flat_map(|_| tracks.iter().cloned()));
            }
            PlayerCommand::RepeatPlaying { count } => match self.state.current().cloned() {
                Some(track) => {
                    let room = self.queue.capacity().saturating_sub(self.queue.len());
                    for _ in 0..(count as usize).min(room) {
                        self.queue.insert(track.clone());
                    }
                    if count as usize > room {
                        self.events.set_status(self.queue_full_status());
                    }
                }
                None => self.events.set_status("Nothing is playing"),
            },
            PlayerCommand::RemoveQueued { index, count } => {
                for removed in 0..count {
                    if let Err(e) = self.queue.remove(index) {
                        debug!("Stopped removing from queue after {}: {}", removed, e);
                        if removed == 0 {
                            self.events.set_status(format!("Cannot remove from queue: {}", e));
                        }
                        break;
                    }
                }
            }
            PlayerCommand::ClearQueue => self.queue.clear(),
            PlayerCommand::ToggleMode(mode) => {
                let mode = self.collection.toggle_mode(mode);
                info!("Playback mode is now {}", mode);
            }
            PlayerCommand::RemoveTrack { playlist, index, count } => {
                let removed = match self.collection.get_mut(&playlist) {
                    Some(tracks) => (0..count).take_while(|_| tracks.remove_track(index).is_some()).count(),
                    None => return,
                };
                if removed == 0 {
                    self.events.set_status(no_track_status(&playlist, index));
                }
            }
            PlayerCommand::RemoveAllTracks { playlist } => {
                if let Some(playlist) = self.collection.get_mut(&playlist) {
                    playlist.remove_all_tracks();
                }
            }
            PlayerCommand::RemovePlaylist { name } => {
                if self.collection.remove(&name).is_some() && self.cursor.as_ref().is_some_and(|c| c.playlist == name) {
                    self.cursor = None;
                }
            }
            PlayerCommand::ToggleFolder { name } => {
                if let Some(playlist) = self.collection.get_mut(&name) {
                    playlist.toggle_open();
                }
            }
            PlayerCommand::CreatePlaylist { name } => self.create_playlist(name.trim()),
        }
    }

    fn enqueue(&mut self, tracks: impl IntoIterator<Item = Arc<Track>>) {
        for track in tracks {
            if !self.queue.add(track) {
                self.events.set_status(self.queue_full_status());
                break;
            }
        }
    }

    fn queue_full_status(&self) -> String {
        format!("Queue is full ({} tracks)", self.queue.capacity())
    }

    fn create_playlist(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        if self.collection.contains(name) {
            self.events.set_status(format!("Playlist '{}' already exists", name));
            return;
        }
        let playlist = Playlist::new(name, self.queue.contents());
        info!("Created playlist '{}' with {} tracks", name, playlist.len());
        self.collection.insert(playlist);
    }

    // Index validity is checked here, at use time.
    fn track_at(&self, playlist: &str, index: usize) -> Option<Arc<Track>> {
        self.collection.get(playlist)?.track(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{BackendInbox, UiInbox};
    use rand::SeedableRng;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    struct Harness {
        events: Events,
        backend: BackendInbox,
        ui: UiInbox,
        snapshots: watch::Receiver<Snapshot>,
        player: JoinHandle<Result<Snapshot>>,
    }

    fn track(uri: &str) -> Arc<Track> {
        Arc::new(Track::new(uri).with_artist("Artist").with_title(uri).with_duration(Duration::from_secs(65)))
    }

    fn collection() -> PlaylistCollection {
        PlaylistCollection::from_playlists([
            Playlist::new("a", vec![track("a0"), track("a1"), track("a2")]),
            Playlist::new("b", vec![track("b0")]),
        ])
    }

    fn start_with(capacity: usize) -> Harness {
        let (events, inboxes) = Events::channel();
        let player = Player::with_selector(
            events.clone(),
            inboxes.player,
            PlaybackQueue::new(capacity),
            Selector::with_rng(StdRng::seed_from_u64(3)),
        );
        let snapshots = player.subscribe();
        Harness {
            events,
            backend: inboxes.backend,
            ui: inboxes.ui,
            snapshots,
            player: tokio::spawn(player.run()),
        }
    }

    fn start() -> Harness {
        start_with(10)
    }

    impl Harness {
        async fn next_play(&mut self) -> Arc<Track> {
            tokio::time::timeout(Duration::from_secs(1), self.backend.play.recv())
                .await
                .expect("play request")
                .expect("play conduit open")
        }

        async fn status(&mut self) -> String {
            tokio::time::timeout(Duration::from_secs(1), self.ui.status.recv())
                .await
                .expect("status")
                .expect("status conduit open")
        }

        async fn wait_for(&mut self, what: impl FnMut(&Snapshot) -> bool) -> Snapshot {
            tokio::time::timeout(Duration::from_secs(1), self.snapshots.wait_for(what))
                .await
                .expect("snapshot condition")
                .expect("player alive")
                .clone()
        }

        async fn loaded(&mut self) {
            self.events.new_playlists(collection());
            self.wait_for(|s| s.collection.len() == 2).await;
        }

        async fn start_playing(&mut self, playlist: &str, index: usize) -> Arc<Track> {
            self.events.command(PlayerCommand::PlaySelected { playlist: playlist.to_string(), index });
            let track = self.next_play().await;
            self.events.report(PlaybackReport::Started(track.clone()));
            self.wait_for(|s| matches!(s.state, PlaybackState::Playing(_))).await;
            track
        }
    }

    #[tokio::test]
    async fn test_next_play_prefers_the_queue() {
        let mut h = start();
        h.loaded().await;
        assert_eq!(h.start_playing("a", 0).await.uri, "a0");

        h.events.command(PlayerCommand::QueueTrack { playlist: "a".into(), index: 2, count: 1 });
        h.wait_for(|s| s.queue.len() == 1).await;

        h.events.next_play();
        assert_eq!(h.next_play().await.uri, "a2");
        h.wait_for(|s| s.queue.is_empty()).await;

        // Queue drained: back to the cursor, which still points at a0.
        h.events.next_play();
        assert_eq!(h.next_play().await.uri, "a1");
    }

    #[tokio::test]
    async fn test_sequential_wraps_around() {
        let mut h = start();
        h.loaded().await;
        h.start_playing("a", 2).await;

        h.events.next_play();
        assert_eq!(h.next_play().await.uri, "a0");
        let snapshot = h.wait_for(|s| s.cursor.as_ref().is_some_and(|c| c.index == 0)).await;
        assert_eq!(snapshot.cursor, Some(Cursor::new("a", 0)));
    }

    #[tokio::test]
    async fn test_next_play_without_selection_does_nothing() {
        let mut h = start();
        h.loaded().await;
        h.events.next_play();
        h.events.shutdown();

        let last = h.player.await.unwrap().unwrap();
        assert!(last.cursor.is_none());
        assert!(h.backend.play.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_pause_toggles_only_with_a_current_track() {
        let mut h = start();
        h.loaded().await;

        h.events.pause();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.backend.transport.try_recv().is_err());
        assert!(h.ui.status.try_recv().is_err());

        h.start_playing("b", 0).await;
        assert_eq!(h.status().await, "Playing: Artist - b0 [1:05]");

        h.events.pause();
        let snapshot = h.wait_for(|s| s.state.is_paused()).await;
        assert_eq!(snapshot.state.current().map(|t| t.uri.as_str()), Some("b0"));
        assert_eq!(h.backend.transport.recv().await, Some(Transport::Pause));
        assert_eq!(h.status().await, "Paused: Artist - b0 [1:05]");

        h.events.pause();
        h.wait_for(|s| matches!(s.state, PlaybackState::Playing(_))).await;
        assert_eq!(h.backend.transport.recv().await, Some(Transport::Resume));
    }

    #[tokio::test]
    async fn test_replay_reissues_current_track() {
        let mut h = start();
        h.loaded().await;
        h.start_playing("a", 1).await;

        h.events.command(PlayerCommand::QueueTrack { playlist: "b".into(), index: 0, count: 1 });
        h.wait_for(|s| s.queue.len() == 1).await;
        h.events.replay();
        assert_eq!(h.next_play().await.uri, "a1");
        assert_eq!(h.wait_for(|s| s.queue.len() == 1).await.queue[0].uri, "b0");
    }

    #[tokio::test]
    async fn test_unavailable_track_keeps_cursor_and_does_not_skip() {
        let mut h = start();
        h.loaded().await;
        h.start_playing("a", 0).await;
        h.status().await;

        h.events.next_play();
        let requested = h.next_play().await;
        h.events.report(PlaybackReport::Unavailable(requested));
        assert_eq!(h.status().await, "Not available");

        h.events.shutdown();
        let last = h.player.await.unwrap().unwrap();
        assert_eq!(last.cursor, Some(Cursor::new("a", 1)));
        assert!(h.backend.play.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_load_failure_keeps_the_loop_alive() {
        let mut h = start();
        h.loaded().await;
        h.events.report(PlaybackReport::LoadFailed { track: track("x"), reason: "bad header".into() });
        assert_eq!(h.status().await, "Could not play Artist - x: bad header");

        h.events.command(PlayerCommand::PlaySelected { playlist: "b".into(), index: 0 });
        assert_eq!(h.next_play().await.uri, "b0");
    }

    #[tokio::test]
    async fn test_pause_after_shutdown_changes_nothing() {
        let mut h = start();
        h.loaded().await;
        h.start_playing("a", 0).await;

        h.events.shutdown();
        h.events.pause();

        let last = h.player.await.unwrap().unwrap();
        assert_eq!(last.state, PlaybackState::Stopped);
        assert!(h.backend.transport.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_queue_commands_repeat_and_respect_capacity() {
        let mut h = start_with(5);
        h.loaded().await;

        h.events.command(PlayerCommand::QueuePlaylist { playlist: "a".into(), count: 3 });
        let snapshot = h.wait_for(|s| s.queue.len() == 5).await;
        let uris: Vec<&str> = snapshot.queue.iter().map(|t| t.uri.as_str()).collect();
        assert_eq!(uris, ["a0", "a1", "a2", "a0", "a1"]);
        assert_eq!(h.status().await, "Queue is full (5 tracks)");

        h.events.command(PlayerCommand::RemoveQueued { index: 3, count: 9 });
        h.wait_for(|s| s.queue.len() == 3).await;
        h.events.command(PlayerCommand::ClearQueue);
        h.wait_for(|s| s.queue.is_empty()).await;
    }

    #[tokio::test]
    async fn test_repeat_playing_inserts_at_front() {
        let mut h = start();
        h.loaded().await;
        h.events.command(PlayerCommand::QueueTrack { playlist: "a".into(), index: 1, count: 1 });
        h.start_playing("b", 0).await;

        h.events.command(PlayerCommand::RepeatPlaying { count: 2 });
        let snapshot = h.wait_for(|s| s.queue.len() == 3).await;
        let uris: Vec<&str> = snapshot.queue.iter().map(|t| t.uri.as_str()).collect();
        assert_eq!(uris, ["b0", "b0", "a1"]);
    }

    #[tokio::test]
    async fn test_repeat_playing_stops_at_capacity() {
        let mut h = start_with(5);
        h.loaded().await;
        h.events.command(PlayerCommand::QueueTrack { playlist: "a".into(), index: 1, count: 2 });
        h.start_playing("b", 0).await;
        assert_eq!(h.status().await, "Playing: Artist - b0 [1:05]");

        h.events.command(PlayerCommand::RepeatPlaying { count: u32::MAX });
        assert_eq!(h.status().await, "Queue is full (5 tracks)");
        let snapshot = h.wait_for(|s| s.queue.len() == 5).await;
        let uris: Vec<&str> = snapshot.queue.iter().map(|t| t.uri.as_str()).collect();
        assert_eq!(uris, ["b0", "b0", "b0", "a1", "a1"]);
    }

    #[tokio::test]
    async fn test_queue_empty_playlist_reports_and_returns() {
        let mut h = start();
        h.loaded().await;
        h.events.command(PlayerCommand::CreatePlaylist { name: "empty".into() });
        h.wait_for(|s| s.collection.contains("empty")).await;

        h.events.command(PlayerCommand::QueuePlaylist { playlist: "empty".into(), count: u32::MAX });
        assert_eq!(h.status().await, "Playlist 'empty' has no tracks");

        // Still serving commands
        h.events.command(PlayerCommand::QueuePlaylist { playlist: "b".into(), count: u32::MAX });
        assert_eq!(h.status().await, "Queue is full (10 tracks)");
        let snapshot = h.wait_for(|s| s.queue.len() == 10).await;
        assert!(snapshot.queue.iter().all(|t| t.uri == "b0"));
    }

    #[tokio::test]
    async fn test_out_of_range_indexes_are_reported() {
        let mut h = start();
        h.loaded().await;

        h.events.command(PlayerCommand::QueueTrack { playlist: "a".into(), index: 7, count: 1 });
        assert_eq!(h.status().await, "No track 8 in 'a'");

        h.events.command(PlayerCommand::RemoveTrack { playlist: "b".into(), index: 1, count: 1 });
        assert_eq!(h.status().await, "No track 2 in 'b'");

        h.events.command(PlayerCommand::RemoveQueued { index: 0, count: 1 });
        assert_eq!(h.status().await, "Cannot remove from queue: queue index 0 out of range (len 0)");

        // Nothing changed along the way
        h.events.shutdown();
        let last = h.player.await.unwrap().unwrap();
        assert!(last.queue.is_empty());
        assert_eq!(last.collection.get("a").map(|p| p.len()), Some(3));
        assert_eq!(last.collection.get("b").map(|p| p.len()), Some(1));
    }

    #[tokio::test]
    async fn test_mode_toggles_are_exclusive() {
        let mut h = start();
        h.loaded().await;

        h.events.command(PlayerCommand::ToggleMode(PlaybackMode::Shuffle));
        h.wait_for(|s| s.mode() == PlaybackMode::Shuffle).await;
        h.events.command(PlayerCommand::ToggleMode(PlaybackMode::ShuffleAll));
        h.wait_for(|s| s.mode() == PlaybackMode::ShuffleAll).await;
        h.events.command(PlayerCommand::ToggleMode(PlaybackMode::ShuffleAll));
        h.wait_for(|s| s.mode() == PlaybackMode::Sequential).await;
    }

    #[tokio::test]
    async fn test_collection_edits() {
        let mut h = start();
        h.loaded().await;
        h.events.command(PlayerCommand::QueueTrack { playlist: "b".into(), index: 0, count: 2 });
        h.events.command(PlayerCommand::CreatePlaylist { name: "  mix ".into() });
        let snapshot = h.wait_for(|s| s.collection.contains("mix")).await;
        assert_eq!(snapshot.collection.get("mix").map(|p| p.len()), Some(2));

        h.events.command(PlayerCommand::RemoveTrack { playlist: "a".into(), index: 1, count: 5 });
        let snapshot = h.wait_for(|s| s.collection.get("a").is_some_and(|p| p.len() == 1)).await;
        assert_eq!(snapshot.collection.get("a").unwrap().tracks()[0].uri, "a0");

        h.events.command(PlayerCommand::RemoveAllTracks { playlist: "mix".into() });
        h.wait_for(|s| s.collection.get("mix").is_some_and(|p| p.is_empty())).await;

        h.events.command(PlayerCommand::RemovePlaylist { name: "b".into() });
        h.wait_for(|s| !s.collection.contains("b")).await;

        h.events.command(PlayerCommand::CreatePlaylist { name: "a".into() });
        assert_eq!(h.status().await, "Playlist 'a' already exists");
    }
}
