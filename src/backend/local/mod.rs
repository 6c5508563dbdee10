// Local-directory session - plays files from the configured music directories
// Each directory of audio files is a playlist; "login" checks the directories and scans them
// on a worker thread, reporting LoggedIn once the catalog is ready

pub mod catalog;
pub mod output;

pub use catalog::Catalog;
pub use output::{AudioOutput, NullOutput};
#[cfg(feature = "audio")]
pub use output::RodioOutput;

use super::{ConnectionState, Credentials, Session, SessionEvent};
use crate::error::SessionError;
use crate::library::{PlaylistCollection, Track};
use std::path::{Path, PathBuf};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub struct LocalSession {
    roots: Vec<PathBuf>,
    catalog: Catalog,
    scanning: Option<std_mpsc::Receiver<Catalog>>,
    output: Box<dyn AudioOutput>,
    events: mpsc::UnboundedSender<SessionEvent>,
    logged_in: bool,
}

impl LocalSession {
    /// `events` is the same sender the output reports end-of-track on.
    pub fn new(roots: Vec<PathBuf>, output: Box<dyn AudioOutput>, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            roots,
            catalog: Catalog::default(),
            scanning: None,
            output,
            events,
            logged_in: false,
        }
    }

    /// The scanned catalog, waiting for the scan thread if it is still running.
    fn catalog(&mut self) -> Result<&Catalog, SessionError> {
        if !self.logged_in {
            return Err(SessionError::Catalog("not logged in".to_string()));
        }
        if let Some(scanning) = self.scanning.take() {
            self.catalog = scanning
                .recv()
                .map_err(|_| SessionError::Catalog("library scan did not finish".to_string()))?;
        }
        Ok(&self.catalog)
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("Session event dropped: nobody is listening");
        }
    }
}

impl Session for LocalSession {
    fn login(&mut self, credentials: &Credentials) -> Result<(), SessionError> {
        if !self.roots.iter().any(|root| root.is_dir()) {
            let roots: Vec<String> = self.roots.iter().map(|r| r.display().to_string()).collect();
            return Err(SessionError::Rejected(format!(
                "no music directory found (looked in: {})",
                roots.join(", ")
            )));
        }

        let (catalog_tx, catalog_rx) = std_mpsc::channel();
        let roots = self.roots.clone();
        let events = self.events.clone();
        let username = credentials.username.clone();
        thread::Builder::new()
            .name("catalog-scan".to_string())
            .spawn(move || {
                let catalog = Catalog::scan(&roots);
                if catalog_tx.send(catalog).is_err() {
                    debug!("Library scan finished after logout");
                    return;
                }
                info!("{} logged in to the local library", username);
                let _ = events.send(SessionEvent::ConnectionStateChanged(ConnectionState::LoggedIn));
            })
            .map_err(|e| SessionError::Catalog(format!("cannot start library scan: {}", e)))?;

        self.scanning = Some(catalog_rx);
        self.logged_in = true;
        Ok(())
    }

    fn list_playlists(&mut self) -> Result<PlaylistCollection, SessionError> {
        Ok(self.catalog()?.playlists())
    }

    fn is_available(&self, track: &Track) -> bool {
        track.available && Path::new(&track.uri).is_file()
    }

    fn load_track(&mut self, track: &Track) -> Result<(), SessionError> {
        self.output.load(Path::new(&track.uri))
    }

    fn play(&mut self) -> Result<(), SessionError> {
        self.output.play()
    }

    fn pause(&mut self) -> Result<(), SessionError> {
        self.output.pause()
    }

    fn stop(&mut self) {
        self.output.stop();
    }

    fn search(&mut self, query: &str) -> Result<Vec<Arc<Track>>, SessionError> {
        Ok(self.catalog()?.search(query))
    }

    fn artist_top_tracks(&mut self, artist: &str) -> Result<Vec<Arc<Track>>, SessionError> {
        Ok(self.catalog()?.by_artist(artist))
    }

    fn logout(&mut self) {
        self.scanning = None;
        if self.logged_in {
            self.logged_in = false;
            self.emit(SessionEvent::ConnectionStateChanged(ConnectionState::LoggedOut));
        }
    }
}
