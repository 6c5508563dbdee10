// Backend session boundary - catalog, login and the actual audio
// The Backend actor turns bus signals into session calls and session events back into bus signals

pub mod local;

use crate::error::{SessionError, StartupError};
use crate::events::{BackendInbox, Events, PlaybackReport, Transport};
use crate::library::{Playlist, PlaylistCollection, Track};
use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(9);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    LoggedOut,
    LoggedIn,
    Disconnected,
}

/// Asynchronous notifications a session emits on its own schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    EndOfTrack,
    PlayTokenLost,
    ConnectionStateChanged(ConnectionState),
    LoginRejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
}

impl Credentials {
    /// First non-blank candidate wins.
    pub fn resolve<I, S>(candidates: I) -> Result<Self, StartupError>
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        candidates
            .into_iter()
            .flatten()
            .map(|name| name.as_ref().trim().to_string())
            .find(|name| !name.is_empty())
            .map(|username| Credentials { username })
            .ok_or(StartupError::MissingCredentials)
    }
}

/// What the core needs from a streaming/local session.
///
/// Calls are expected to return quickly; anything slow (decoding, network)
/// happens elsewhere and reports back through `SessionEvent`s.
pub trait Session: Send {
    fn login(&mut self, credentials: &Credentials) -> Result<(), SessionError>;

    fn list_playlists(&mut self) -> Result<PlaylistCollection, SessionError>;

    fn is_available(&self, track: &Track) -> bool;

    fn load_track(&mut self, track: &Track) -> Result<(), SessionError>;

    /// Starts or resumes the loaded track.
    fn play(&mut self) -> Result<(), SessionError>;

    fn pause(&mut self) -> Result<(), SessionError>;

    fn stop(&mut self);

    fn search(&mut self, query: &str) -> Result<Vec<Arc<Track>>, SessionError>;

    fn artist_top_tracks(&mut self, artist: &str) -> Result<Vec<Arc<Track>>, SessionError>;

    fn logout(&mut self);
}

/// Logs in and waits until the session reports `LoggedIn`.
///
/// The wait is bounded; running out of time is a failed login, never a retry.
pub async fn connect(
    session: &mut dyn Session,
    session_events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<(), StartupError> {
    info!("Logging in as {}", credentials.username);
    session
        .login(credentials)
        .map_err(|e| StartupError::LoginFailed(e.to_string()))?;

    let logged_in = async {
        while let Some(event) = session_events.recv().await {
            match event {
                SessionEvent::ConnectionStateChanged(ConnectionState::LoggedIn) => return Ok(()),
                SessionEvent::LoginRejected(reason) => return Err(StartupError::LoginFailed(reason)),
                other => debug!("Ignoring {:?} while logging in", other),
            }
        }
        Err(StartupError::SessionClosed)
    };

    match tokio::time::timeout(timeout, logged_in).await {
        Ok(result) => result,
        Err(_) => Err(StartupError::LoginTimeout(timeout)),
    }
}

/// Optional comma-separated list of playlist names to keep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistFilter {
    names: Option<HashSet<String>>,
}

impl PlaylistFilter {
    pub fn parse(spec: Option<&str>) -> Self {
        let names: HashSet<String> = spec
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            names: (!names.is_empty()).then_some(names),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_none()
    }

    pub fn allows(&self, name: &str) -> bool {
        self.names.as_ref().map_or(true, |names| names.contains(name))
    }

    pub fn apply(&self, collection: PlaylistCollection) -> PlaylistCollection {
        if self.is_empty() {
            return collection;
        }
        let kept = collection
            .names()
            .iter()
            .filter(|name| self.allows(name))
            .filter_map(|name| collection.get(name).cloned());
        let mut filtered = PlaylistCollection::from_playlists(kept);
        filtered.set_mode(collection.mode());
        filtered
    }
}

/// Actor owning the session. Reports every play outcome so the player never
/// has to guess.
pub struct Backend {
    session: Box<dyn Session>,
    session_events: mpsc::UnboundedReceiver<SessionEvent>,
    events: Events,
    inbox: BackendInbox,
    filter: PlaylistFilter,
}

impl Backend {
    pub fn new(
        session: Box<dyn Session>,
        session_events: mpsc::UnboundedReceiver<SessionEvent>,
        events: Events,
        inbox: BackendInbox,
        filter: PlaylistFilter,
    ) -> Self {
        Self {
            session,
            session_events,
            events,
            inbox,
            filter,
        }
    }

    /// Fetches the catalog, filters it and hands it to the player.
    pub fn publish_playlists(&mut self) -> Result<usize> {
        let collection = self.filter.apply(self.session.list_playlists()?);
        let count = collection.len();
        info!("Publishing {} playlists", count);
        self.events.new_playlists(collection);
        Ok(count)
    }

    pub async fn run(mut self) -> Result<()> {
        info!("Backend started");

        loop {
            tokio::select! {
                biased;
                _ = self.inbox.shutdown.wait() => break,
                Some(event) = self.session_events.recv() => self.on_session_event(event),
                Some(transport) = self.inbox.transport.recv() => self.on_transport(transport),
                Some(track) = self.inbox.play.recv() => self.play(track),
                Some(query) = self.inbox.search.recv() => self.search(&query),
                Some(artist) = self.inbox.artist_top_tracks.recv() => self.artist_top_tracks(&artist),
            }
        }

        self.session.stop();
        self.session.logout();
        info!("Backend stopped");
        Ok(())
    }

    fn play(&mut self, track: Arc<Track>) {
        if !self.session.is_available(&track) {
            self.events.report(PlaybackReport::Unavailable(track));
            return;
        }

        let started = self.session.load_track(&track).and_then(|_| self.session.play());
        match started {
            Ok(()) => self.events.report(PlaybackReport::Started(track)),
            Err(e) => {
                error!("Playback of {} failed: {}", track.uri, e);
                self.events.report(PlaybackReport::LoadFailed {
                    track,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn on_transport(&mut self, transport: Transport) {
        let result = match transport {
            Transport::Pause => self.session.pause(),
            Transport::Resume => self.session.play(),
        };
        if let Err(e) = result {
            warn!("{:?} failed: {}", transport, e);
            self.events.set_status(e.to_string());
        }
    }

    fn on_session_event(&mut self, event: SessionEvent) {
        debug!("Session event {:?}", event);
        match event {
            SessionEvent::EndOfTrack => self.events.next_play(),
            SessionEvent::PlayTokenLost => self.events.play_token_lost(),
            SessionEvent::ConnectionStateChanged(state) => info!("Connection state: {:?}", state),
            SessionEvent::LoginRejected(reason) => warn!("Session rejected: {}", reason),
        }
    }

    fn search(&mut self, query: &str) {
        match self.session.search(query) {
            Ok(tracks) => self.publish_results(format!("*{}", query), tracks),
            Err(e) => {
                warn!("Search for '{}' failed: {}", query, e);
                self.events.set_status(format!("Search failed: {}", e));
            }
        }
    }

    fn artist_top_tracks(&mut self, artist: &str) {
        match self.session.artist_top_tracks(artist) {
            Ok(tracks) => self.publish_results(format!("*{}", artist), tracks),
            Err(e) => {
                warn!("Top tracks for '{}' failed: {}", artist, e);
                self.events.set_status(format!("Could not load tracks for {}: {}", artist, e));
            }
        }
    }

    fn publish_results(&mut self, name: String, tracks: Vec<Arc<Track>>) {
        self.events.set_status(format!("{}: {} tracks", name, tracks.len()));
        let results = PlaylistCollection::from_playlists([Playlist::new(name, tracks)]);
        self.events.new_playlists(results);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_filter_parsing() {
        let filter = PlaylistFilter::parse(Some(" Road trip ,Chill,, "));
        assert!(filter.allows("Road trip"));
        assert!(filter.allows("Chill"));
        assert!(!filter.allows("chill"));
        assert!(!filter.allows(""));

        assert!(PlaylistFilter::parse(None).is_empty());
        assert!(PlaylistFilter::parse(Some(" , ")).is_empty());
        assert!(PlaylistFilter::parse(None).allows("anything"));
    }

    #[test]
    fn test_playlist_filter_apply() {
        let collection = PlaylistCollection::from_playlists([
            Playlist::new("a", vec![]),
            Playlist::new("b", vec![]),
            Playlist::new("c", vec![]),
        ]);
        let filtered = PlaylistFilter::parse(Some("c,a,zzz")).apply(collection);
        assert_eq!(filtered.names(), ["a", "c"]);
    }

    #[test]
    fn test_credentials_resolution() {
        let creds = Credentials::resolve([None, Some("  "), Some(" ada "), Some("bob")]).unwrap();
        assert_eq!(creds.username, "ada");

        let missing = Credentials::resolve::<_, &str>([None, Some("")]);
        assert!(matches!(missing, Err(StartupError::MissingCredentials)));
    }
}
