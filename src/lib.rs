// tuneloop - terminal playback controller
// Actors talk over the event bus: backend session, player orchestrator and the UI

pub mod backend;  // session boundary + local music directories
pub mod config;   // settings and defaults
pub mod error;    // startup and session failures
pub mod events;   // the bus every actor publishes on
pub mod keyboard; // key sequences -> commands
pub mod library;  // tracks, playlists, playback mode
pub mod logging;  // file logging setup
pub mod player;   // what plays next, and when
pub mod queue;    // bounded FIFO of user-queued tracks
pub mod selector; // sequential / shuffle / shuffle-all choice
#[cfg(feature = "tui")]
pub mod ui;       // terminal interface

// Export the stuff other modules actually use
pub use config::Config;
pub use events::Events;
pub use library::{PlaybackMode, Playlist, PlaylistCollection, Track};
pub use player::{Player, PlayerCommand, Snapshot};
pub use queue::PlaybackQueue;
