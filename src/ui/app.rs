use super::events::{translate, Input};
use super::TerminalManager;
use crate::events::{Events, UiInbox};
use crate::keyboard::{Command, Dispatch, Dispatcher, Key, KeyMap, Prompt, Typed, View};
use crate::library::{PlaybackMode, Playlist, PlaylistEntry, PlaylistKind};
use crate::player::{PlayerCommand, Snapshot};
use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyEventKind};
use futures::StreamExt;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Highlighted line per list view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub playlists: usize,
    pub tracks: usize,
    pub queue: usize,
}

impl Selection {
    pub fn get(&self, view: View) -> usize {
        match view {
            View::Playlists => self.playlists,
            View::Tracks => self.tracks,
            View::Queue => self.queue,
            View::Status => 0,
        }
    }

    fn set(&mut self, view: View, index: usize) {
        match view {
            View::Playlists => self.playlists = index,
            View::Tracks => self.tracks = index,
            View::Queue => self.queue = index,
            View::Status => {}
        }
    }
}

/// Everything one frame needs, detached from the app so drawing never
/// borrows it.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub playlists: Vec<String>,
    pub tracks_title: String,
    pub tracks: Vec<String>,
    pub queue: Vec<String>,
    pub selection: Selection,
    pub focus: View,
    pub status: String,
}

/// The UI actor: reads keys, owns focus and selection, renders snapshots
/// published by the player.
pub struct App {
    events: Events,
    inbox: UiInbox,
    snapshots: watch::Receiver<Snapshot>,
    dispatcher: Dispatcher,
    focus: View,
    selection: Selection,
    status: String,
    page_size: usize,
}

impl App {
    pub fn new(events: Events, inbox: UiInbox, snapshots: watch::Receiver<Snapshot>, keymap: KeyMap) -> Self {
        Self {
            events,
            inbox,
            snapshots,
            dispatcher: Dispatcher::new(keymap),
            focus: View::Playlists,
            selection: Selection::default(),
            status: String::new(),
            page_size: 10,
        }
    }

    pub fn focus(&self) -> View {
        self.focus
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub async fn run(mut self, terminal: &mut TerminalManager) -> Result<()> {
        info!("UI started");
        let mut keys = EventStream::new();

        loop {
            self.page_size = terminal.list_height()?;
            let screen = self.screen();
            terminal.draw(|f| Self::render(f, &screen))?;

            tokio::select! {
                biased;
                _ = self.inbox.shutdown.wait() => break,
                Some(status) = self.inbox.status.recv() => self.status = status,
                Some(()) = self.inbox.play_token_lost.recv() => self.status = "Play token lost".to_string(),
                changed = self.snapshots.changed() => {
                    if changed.is_err() {
                        debug!("Player is gone");
                        break;
                    }
                }
                event = keys.next() => match event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => match translate(key) {
                        Some(Input::Interrupt) => self.events.shutdown(),
                        Some(Input::Key(key)) => self.handle_key(key),
                        None => {}
                    },
                    Some(Ok(_)) => {}
                    Some(Err(e)) => warn!("Terminal input error: {}", e),
                    None => {
                        warn!("Terminal input closed");
                        self.events.shutdown();
                    }
                },
            }
        }

        info!("UI stopped");
        Ok(())
    }

    pub fn handle_key(&mut self, key: Key) {
        if self.dispatcher.is_typing() {
            match self.dispatcher.type_key(key) {
                Typed::Pending => {}
                Typed::Submitted(prompt, line) => {
                    self.focus = View::Playlists;
                    match prompt {
                        Prompt::Search => self.events.search(line),
                        Prompt::CreatePlaylist => self.events.command(PlayerCommand::CreatePlaylist { name: line }),
                    }
                }
                Typed::Cancelled => self.focus = View::Playlists,
            }
            return;
        }

        let mut fired = None;
        self.dispatcher.key_pressed(self.focus, key, |dispatch| fired = Some(dispatch));
        if let Some(dispatch) = fired {
            self.execute(dispatch);
        }
    }

    fn execute(&mut self, dispatch: Dispatch) {
        debug!("{} x{} in {:?}", dispatch.command, dispatch.times(), self.focus);
        let snapshot = self.snapshots.borrow().clone();
        let count = dispatch.times();

        match dispatch.command {
            Command::PauseTrack => self.events.pause(),
            Command::ShuffleMode => self.events.command(PlayerCommand::ToggleMode(PlaybackMode::Shuffle)),
            Command::ShuffleAllMode => self.events.command(PlayerCommand::ToggleMode(PlaybackMode::ShuffleAll)),
            Command::NextTrack => self.events.next_play(),
            Command::ReplayTrack => self.events.replay(),
            Command::Search => self.start_typing(Prompt::Search),
            Command::Quit => self.events.shutdown(),
            Command::QueueTrack => {
                if let Some(playlist) = self.selected_playlist(&snapshot) {
                    self.events.command(PlayerCommand::QueueTrack {
                        playlist: playlist.name().to_string(),
                        index: self.selection.tracks,
                        count,
                    });
                }
            }
            Command::QueuePlaylist => {
                if let Some(playlist) = self.selected_playlist(&snapshot) {
                    self.events.command(PlayerCommand::QueuePlaylist {
                        playlist: playlist.name().to_string(),
                        count,
                    });
                }
            }
            Command::RepeatPlayingTrack => self.events.command(PlayerCommand::RepeatPlaying { count }),
            Command::RemoveTrack => self.remove(&snapshot, count),
            Command::RemoveAllTracks => match self.focus {
                View::Tracks => {
                    if let Some(playlist) = self.selected_playlist(&snapshot) {
                        self.events.command(PlayerCommand::RemoveAllTracks {
                            playlist: playlist.name().to_string(),
                        });
                    }
                    self.focus = View::Playlists;
                }
                View::Queue => {
                    self.events.command(PlayerCommand::ClearQueue);
                    self.focus = View::Tracks;
                }
                _ => {}
            },
            Command::GoToFirstLine => self.select(&snapshot, self.focus, 0),
            Command::GoToLastLine => {
                let last = match dispatch.count {
                    0 => self.line_count(&snapshot, self.focus).saturating_sub(1),
                    line => line as usize - 1,
                };
                self.select(&snapshot, self.focus, last);
            }
            Command::PageUp => self.move_by(&snapshot, -(self.page_size as isize)),
            Command::PageDown => self.move_by(&snapshot, self.page_size as isize),
            Command::PlaySelectedTrack => {
                if let Some(playlist) = self.selected_playlist(&snapshot) {
                    self.events.command(PlayerCommand::PlaySelected {
                        playlist: playlist.name().to_string(),
                        index: self.selection.tracks,
                    });
                }
            }
            Command::Up => self.move_by(&snapshot, -(count as isize)),
            Command::Down => self.move_by(&snapshot, count as isize),
            Command::Left => self.focus = self.focus.left(),
            Command::Right => self.focus = self.focus.right(),
            Command::OpenCloseFolder => {
                if let Some(entry) = self.selected_entry(&snapshot).filter(|e| e.kind != PlaylistKind::Leaf) {
                    self.events.command(PlayerCommand::ToggleFolder { name: entry.name });
                }
            }
            Command::ArtistAlbums => {
                let artist = self
                    .selected_playlist(&snapshot)
                    .and_then(|playlist| playlist.track(self.selection.tracks))
                    .and_then(|track| track.artist.clone());
                match artist {
                    Some(artist) => self.events.get_artist_top_tracks(artist),
                    None => self.status = "No artist for this track".to_string(),
                }
            }
            Command::CreatePlaylist => self.start_typing(Prompt::CreatePlaylist),
        }
    }

    fn start_typing(&mut self, prompt: Prompt) {
        self.dispatcher.start_typing(prompt);
        self.focus = View::Status;
    }

    fn remove(&mut self, snapshot: &Snapshot, count: u32) {
        match self.focus {
            View::Playlists => {
                if let Some(entry) = self.selected_entry(snapshot) {
                    self.events.command(PlayerCommand::RemovePlaylist { name: entry.name });
                }
            }
            View::Tracks => {
                if let Some(playlist) = self.selected_playlist(snapshot) {
                    self.events.command(PlayerCommand::RemoveTrack {
                        playlist: playlist.name().to_string(),
                        index: self.selection.tracks,
                        count,
                    });
                }
            }
            View::Queue => {
                if !snapshot.queue.is_empty() {
                    self.events.command(PlayerCommand::RemoveQueued {
                        index: self.selection.queue,
                        count,
                    });
                }
            }
            View::Status => {}
        }
    }

    fn selected_entry(&self, snapshot: &Snapshot) -> Option<PlaylistEntry> {
        snapshot.collection.entries().get(self.selection.playlists).cloned()
    }

    fn selected_playlist<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a Playlist> {
        let entry = self.selected_entry(snapshot)?;
        snapshot.collection.get(&entry.name)
    }

    fn line_count(&self, snapshot: &Snapshot, view: View) -> usize {
        match view {
            View::Playlists => snapshot.collection.entries().len(),
            View::Tracks => self.selected_playlist(snapshot).map_or(0, Playlist::len),
            View::Queue => snapshot.queue.len(),
            View::Status => 0,
        }
    }

    /// Moving the playlists highlight starts the tracks view from the top.
    fn select(&mut self, snapshot: &Snapshot, view: View, index: usize) {
        let last = self.line_count(snapshot, view).saturating_sub(1);
        let index = index.min(last);
        if view == View::Playlists && index != self.selection.playlists {
            self.selection.tracks = 0;
        }
        self.selection.set(view, index);
    }

    fn move_by(&mut self, snapshot: &Snapshot, delta: isize) {
        let current = self.selection.get(self.focus);
        self.select(snapshot, self.focus, current.saturating_add_signed(delta));
    }

    pub fn screen(&self) -> Screen {
        let snapshot = self.snapshots.borrow();
        let playlists = snapshot.collection.entries().iter().map(PlaylistEntry::label).collect();
        let (tracks_title, tracks) = match self.selected_playlist(&snapshot) {
            Some(playlist) => (playlist.name().to_string(), playlist.track_lines()),
            None => ("Tracks".to_string(), Vec::new()),
        };
        let queue = snapshot.queue.iter().map(|track| track.to_string()).collect();

        let status = match self.dispatcher.typed_line() {
            Some((Prompt::Search, line)) => format!("Search: {}", line),
            Some((Prompt::CreatePlaylist, line)) => format!("New playlist name: {}", line),
            None => format!("{}{}", snapshot.mode().status_prefix(), self.status),
        };

        Screen {
            playlists,
            tracks_title,
            tracks,
            queue,
            selection: self.selection,
            focus: self.focus,
            status,
        }
    }

    fn render(f: &mut Frame, screen: &Screen) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // Lists
                Constraint::Length(3), // Status line
            ])
            .split(f.area());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(25),
                Constraint::Percentage(50),
                Constraint::Percentage(25),
            ])
            .split(rows[0]);

        Self::render_list(f, columns[0], "Playlists", &screen.playlists, screen, View::Playlists);
        Self::render_list(f, columns[1], &screen.tracks_title, &screen.tracks, screen, View::Tracks);
        Self::render_list(f, columns[2], "Queue", &screen.queue, screen, View::Queue);
        Self::render_status_bar(f, rows[1], screen);
    }

    fn render_list(f: &mut Frame, area: Rect, title: &str, lines: &[String], screen: &Screen, view: View) {
        let focused = screen.focus == view;
        let items: Vec<ListItem> = lines.iter().map(|line| ListItem::new(line.as_str())).collect();

        let border_style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title.to_string())
                    .border_style(border_style),
            )
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            .highlight_symbol("→ ");

        let mut state = ListState::default();
        if !lines.is_empty() {
            state.select(Some(screen.selection.get(view).min(lines.len() - 1)));
        }
        f.render_stateful_widget(list, area, &mut state);
    }

    fn render_status_bar(f: &mut Frame, area: Rect, screen: &Screen) {
        let border_style = if screen.focus == View::Status {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let status = Paragraph::new(screen.status.as_str())
            .style(Style::default().fg(Color::Green))
            .block(Block::default().borders(Borders::ALL).border_style(border_style));
        f.render_widget(status, area);
    }
}
