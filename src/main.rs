// tuneloop - terminal playback controller
// Wires the backend session, the player and the TUI onto one event bus

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tuneloop::{
    backend::{
        connect,
        local::{LocalSession, RodioOutput},
        Backend, Credentials, PlaylistFilter,
    },
    config::Config,
    error::StartupError,
    keyboard::KeyMap,
    logging::{init_logging, log_dir, redirect_stderr_to_null},
    ui::{App, TerminalManager},
    Events, PlaybackQueue, Player,
};

#[derive(Parser)]
#[command(name = "tuneloop")]
#[command(about = "Browse playlists, build a queue and keep the music going, all from the terminal")]
struct Args {
    /// Account name to log in with (overrides the config file)
    #[arg(long)]
    username: Option<String>,

    /// Comma-separated playlist names to show; everything else is hidden
    #[arg(long)]
    playlists: Option<String>,

    /// JSON key-functions file
    #[arg(long)]
    keys: Option<PathBuf>,

    /// Music directory to scan (repeatable, replaces the configured list)
    #[arg(long = "music-dir")]
    music_dir: Vec<PathBuf>,

    /// Enable developer logging (keeps stderr attached)
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Fatal: {:#}", e);
        // stderr may point at /dev/null by now
        println!("tuneloop: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let log_dir = log_dir()?;
    init_logging(&log_dir, args.dev)?;
    info!("tuneloop starting up");

    if !args.dev {
        debug!("Redirecting stderr to keep audio chatter off the screen");
        redirect_stderr_to_null()?;
    }

    let mut config = Config::load().map_err(|e| StartupError::Config(format!("{:#}", e)))?;
    if !args.music_dir.is_empty() {
        config.music_directories = args.music_dir.clone();
    }
    if args.keys.is_some() {
        config.key_functions_file = args.keys.clone();
    }
    if args.playlists.is_some() {
        config.playlist_filter = args.playlists.clone();
    }

    let keymap = load_keymap(&config);
    let credentials = Credentials::resolve([
        args.username.clone(),
        config.username.clone(),
        std::env::var("USER").ok(),
    ])?;

    let (session_tx, mut session_rx) = mpsc::unbounded_channel();
    let output = RodioOutput::open(session_tx.clone()).context("Failed to open the audio device")?;
    let mut session = LocalSession::new(config.music_directories.clone(), Box::new(output), session_tx);
    connect(&mut session, &mut session_rx, &credentials, config.login_timeout()).await?;

    let (events, inboxes) = Events::channel();
    let player = Player::new(events.clone(), inboxes.player, PlaybackQueue::new(config.queue_capacity));
    let snapshots = player.subscribe();

    let filter = PlaylistFilter::parse(config.playlist_filter.as_deref());
    let mut backend = Backend::new(Box::new(session), session_rx, events.clone(), inboxes.backend, filter);
    backend.publish_playlists().context("Failed to load playlists")?;

    let player_task = tokio::spawn(player.run());
    let backend_task = tokio::spawn(backend.run());

    let ui_result = {
        let mut terminal = TerminalManager::new()?;
        App::new(events.clone(), inboxes.ui, snapshots, keymap)
            .run(&mut terminal)
            .await
    };

    // Whatever ended the UI, the actors go down with it
    events.shutdown();

    match player_task.await {
        Ok(Ok(snapshot)) => debug!("Player finished with {} queued tracks", snapshot.queue.len()),
        Ok(Err(e)) => warn!("Player error: {:#}", e),
        Err(e) => warn!("Player task error: {}", e),
    }
    match backend_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Backend error: {:#}", e),
        Err(e) => warn!("Backend task error: {}", e),
    }

    ui_result?;
    info!("tuneloop shut down cleanly");
    Ok(())
}

/// User bindings first, defaults for the rest. A broken file is not fatal.
fn load_keymap(config: &Config) -> KeyMap {
    let mut builder = KeyMap::builder();
    if let Some(path) = config.key_functions_path() {
        if let Err(e) = builder.load_file(&path) {
            warn!("Ignoring key functions file: {:#}", e);
        }
    }
    builder.build()
}
