// Event bus - typed one-way conduits between the UI, player and backend actors
// Nobody calls another actor directly; everything goes through here

use crate::library::{PlaylistCollection, Track};
use crate::player::PlayerCommand;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

/// Player -> backend: what to do with the output that is already loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Pause,
    Resume,
}

/// Backend -> player: outcome of a `Play` request.
#[derive(Debug, Clone)]
pub enum PlaybackReport {
    Started(Arc<Track>),
    Unavailable(Arc<Track>),
    LoadFailed { track: Arc<Track>, reason: String },
}

/// Cloneable publishing side of the bus. Every conduit is unbounded, so a
/// send never waits on the receiving actor.
#[derive(Clone)]
pub struct Events {
    new_playlists: mpsc::UnboundedSender<PlaylistCollection>,
    play: mpsc::UnboundedSender<Arc<Track>>,
    pause: mpsc::UnboundedSender<()>,
    replay: mpsc::UnboundedSender<()>,
    next_play: mpsc::UnboundedSender<()>,
    play_token_lost: mpsc::UnboundedSender<()>,
    status: mpsc::UnboundedSender<String>,
    search: mpsc::UnboundedSender<String>,
    artist_top_tracks: mpsc::UnboundedSender<String>,
    transport: mpsc::UnboundedSender<Transport>,
    playback: mpsc::UnboundedSender<PlaybackReport>,
    commands: mpsc::UnboundedSender<PlayerCommand>,
    shutdown: Arc<watch::Sender<bool>>,
}

/// Receiving ends owned by the player orchestrator.
pub struct PlayerInbox {
    pub new_playlists: mpsc::UnboundedReceiver<PlaylistCollection>,
    pub pause: mpsc::UnboundedReceiver<()>,
    pub replay: mpsc::UnboundedReceiver<()>,
    pub next_play: mpsc::UnboundedReceiver<()>,
    pub playback: mpsc::UnboundedReceiver<PlaybackReport>,
    pub commands: mpsc::UnboundedReceiver<PlayerCommand>,
    pub shutdown: ShutdownListener,
}

/// Receiving ends owned by the backend session actor.
pub struct BackendInbox {
    pub play: mpsc::UnboundedReceiver<Arc<Track>>,
    pub transport: mpsc::UnboundedReceiver<Transport>,
    pub search: mpsc::UnboundedReceiver<String>,
    pub artist_top_tracks: mpsc::UnboundedReceiver<String>,
    pub shutdown: ShutdownListener,
}

/// Receiving ends owned by the terminal UI.
pub struct UiInbox {
    pub status: mpsc::UnboundedReceiver<String>,
    pub play_token_lost: mpsc::UnboundedReceiver<()>,
    pub shutdown: ShutdownListener,
}

pub struct Inboxes {
    pub player: PlayerInbox,
    pub backend: BackendInbox,
    pub ui: UiInbox,
}

impl Events {
    pub fn channel() -> (Events, Inboxes) {
        let (new_playlists, new_playlists_rx) = mpsc::unbounded_channel();
        let (play, play_rx) = mpsc::unbounded_channel();
        let (pause, pause_rx) = mpsc::unbounded_channel();
        let (replay, replay_rx) = mpsc::unbounded_channel();
        let (next_play, next_play_rx) = mpsc::unbounded_channel();
        let (play_token_lost, play_token_lost_rx) = mpsc::unbounded_channel();
        let (status, status_rx) = mpsc::unbounded_channel();
        let (search, search_rx) = mpsc::unbounded_channel();
        let (artist_top_tracks, artist_top_tracks_rx) = mpsc::unbounded_channel();
        let (transport, transport_rx) = mpsc::unbounded_channel();
        let (playback, playback_rx) = mpsc::unbounded_channel();
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let events = Events {
            new_playlists,
            play,
            pause,
            replay,
            next_play,
            play_token_lost,
            status,
            search,
            artist_top_tracks,
            transport,
            playback,
            commands,
            shutdown: Arc::new(shutdown),
        };

        let inboxes = Inboxes {
            player: PlayerInbox {
                new_playlists: new_playlists_rx,
                pause: pause_rx,
                replay: replay_rx,
                next_play: next_play_rx,
                playback: playback_rx,
                commands: commands_rx,
                shutdown: ShutdownListener::new(shutdown_rx.clone()),
            },
            backend: BackendInbox {
                play: play_rx,
                transport: transport_rx,
                search: search_rx,
                artist_top_tracks: artist_top_tracks_rx,
                shutdown: ShutdownListener::new(shutdown_rx.clone()),
            },
            ui: UiInbox {
                status: status_rx,
                play_token_lost: play_token_lost_rx,
                shutdown: ShutdownListener::new(shutdown_rx),
            },
        };

        (events, inboxes)
    }

    pub fn new_playlists(&self, playlists: PlaylistCollection) {
        debug!("NewPlaylists ({} playlists)", playlists.len());
        deliver(&self.new_playlists, playlists, "new_playlists");
    }

    pub fn play(&self, track: Arc<Track>) {
        debug!("Play {}", track);
        deliver(&self.play, track, "play");
    }

    pub fn pause(&self) {
        deliver(&self.pause, (), "pause");
    }

    pub fn replay(&self) {
        deliver(&self.replay, (), "replay");
    }

    pub fn next_play(&self) {
        deliver(&self.next_play, (), "next_play");
    }

    pub fn play_token_lost(&self) {
        deliver(&self.play_token_lost, (), "play_token_lost");
    }

    pub fn set_status(&self, message: impl Into<String>) {
        deliver(&self.status, message.into(), "status");
    }

    pub fn search(&self, query: impl Into<String>) {
        deliver(&self.search, query.into(), "search");
    }

    pub fn get_artist_top_tracks(&self, artist: impl Into<String>) {
        deliver(&self.artist_top_tracks, artist.into(), "artist_top_tracks");
    }

    pub fn transport(&self, transport: Transport) {
        deliver(&self.transport, transport, "transport");
    }

    pub fn report(&self, report: PlaybackReport) {
        deliver(&self.playback, report, "playback");
    }

    pub fn command(&self, command: PlayerCommand) {
        deliver(&self.commands, command, "commands");
    }

    /// Latches the shutdown flag. Calling it again is harmless.
    pub fn shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            debug!("Shutdown requested");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// A fresh listener; sees the shutdown even if it already happened.
    pub fn shutdown_listener(&self) -> ShutdownListener {
        ShutdownListener::new(self.shutdown.subscribe())
    }
}

fn deliver<T>(tx: &mpsc::UnboundedSender<T>, value: T, conduit: &str) {
    if tx.send(value).is_err() {
        trace!("Dropped signal on '{}': receiver is gone", conduit);
    }
}

/// Read side of the shutdown latch.
#[derive(Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested, or once every publisher is
    /// gone (nobody is left to drive the actor).
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|down| *down).await;
    }
}
