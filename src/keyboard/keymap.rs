use super::command::Command;
use super::key::{parse_sequence, Key, KeySequence};
use super::View;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// One entry of the user key-mapping file:
/// `[{"Key": "dd", "Command": "RemoveTrack"}, ...]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Command")]
    pub command: String,
}

const DEFAULT_KEYS: &[(Command, &[&str])] = &[
    (Command::PauseTrack, &["p"]),
    (Command::ShuffleMode, &["s"]),
    (Command::ShuffleAllMode, &["S"]),
    (Command::NextTrack, &[">"]),
    (Command::ReplayTrack, &["<"]),
    (Command::Search, &["/"]),
    (Command::Quit, &["q"]),
    (Command::QueueTrack, &["u"]),
    (Command::QueuePlaylist, &["u"]),
    (Command::RepeatPlayingTrack, &["r"]),
    (Command::RemoveTrack, &["dd"]),
    (Command::RemoveAllTracks, &["D"]),
    (Command::GoToFirstLine, &["gg", "<home>"]),
    (Command::GoToLastLine, &["G", "<end>"]),
    (Command::PageUp, &["<pgup>"]),
    (Command::PageDown, &["<pgdn>"]),
    (Command::PlaySelectedTrack, &["<space>", "<enter>"]),
    (Command::Up, &["<up>", "k"]),
    (Command::Down, &["<down>", "j"]),
    (Command::Left, &["<left>", "h"]),
    (Command::Right, &["<right>", "l"]),
    (Command::OpenCloseFolder, &["<space>"]),
    (Command::ArtistAlbums, &["i"]),
    (Command::CreatePlaylist, &["c"]),
];

/// Commands bound in every list view. Registered first so that the
/// view-specific table below overrides them.
const ANY_VIEW: &[Command] = &[
    Command::PauseTrack,
    Command::ShuffleMode,
    Command::ShuffleAllMode,
    Command::NextTrack,
    Command::ReplayTrack,
    Command::Search,
    Command::RepeatPlayingTrack,
    Command::Quit,
    Command::GoToFirstLine,
    Command::GoToLastLine,
    Command::PageUp,
    Command::PageDown,
    Command::Up,
    Command::Down,
    Command::RemoveTrack,
    Command::RemoveAllTracks,
];

const VIEW_SPECIFIC: &[(Command, View)] = &[
    (Command::QueueTrack, View::Tracks),
    (Command::QueuePlaylist, View::Playlists),
    (Command::PlaySelectedTrack, View::Tracks),
    (Command::Left, View::Tracks),
    (Command::Left, View::Queue),
    (Command::Right, View::Playlists),
    (Command::Right, View::Tracks),
    (Command::OpenCloseFolder, View::Playlists),
    (Command::ArtistAlbums, View::Tracks),
    (Command::CreatePlaylist, View::Queue),
];

/// Immutable `(view, key sequence) -> command` table.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    bindings: HashMap<(View, KeySequence), Command>,
    prefixes: HashSet<(View, Key)>,
}

impl KeyMap {
    pub fn builder() -> KeyMapBuilder {
        KeyMapBuilder::new()
    }

    pub fn with_defaults() -> Self {
        KeyMapBuilder::new().build()
    }

    pub fn lookup(&self, view: View, sequence: &[Key]) -> Option<Command> {
        self.bindings.get(&(view, sequence.to_vec())).copied()
    }

    /// Whether `key` is the first half of some two-key binding in `view`.
    pub fn starts_sequence(&self, view: View, key: Key) -> bool {
        self.prefixes.contains(&(view, key))
    }
}

/// Collects key assignments, user entries first, then fills in defaults
/// for every command the user did not mention.
///
/// Overrides work per command, never per key: remapping a command drops all
/// of its default keys, which stay free for other commands.
#[derive(Debug, Default)]
pub struct KeyMapBuilder {
    configured: Vec<(KeySequence, Command)>,
    used: HashSet<Command>,
}

impl KeyMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_key(&mut self, sequence: KeySequence, command: Command) -> &mut Self {
        self.configured.push((sequence, command));
        self.used.insert(command);
        self
    }

    /// Adds user entries, skipping (and logging) the ones that make no sense.
    pub fn add_entries(&mut self, entries: &[KeyEntry]) -> &mut Self {
        for entry in entries {
            let command = match entry.command.parse::<Command>() {
                Ok(command) => command,
                Err(e) => {
                    warn!("Ignoring key mapping '{}': {}", entry.key, e);
                    continue;
                }
            };
            match parse_sequence(&entry.key) {
                Some(sequence) => {
                    debug!("User key '{}' -> {}", entry.key, command);
                    self.add_key(sequence, command);
                }
                None => warn!("Ignoring key mapping for {}: cannot parse key '{}'", command, entry.key),
            }
        }
        self
    }

    /// Reads a key-mapping file. A missing file is not an error; an
    /// unreadable or malformed one is.
    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        if !path.exists() {
            debug!("No key functions file at {}", path.display());
            return Ok(0);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read key functions file {}", path.display()))?;
        let entries: Vec<KeyEntry> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse key functions file {}", path.display()))?;

        self.add_entries(&entries);
        info!("Loaded {} key mappings from {}", entries.len(), path.display());
        Ok(entries.len())
    }

    pub fn build(mut self) -> KeyMap {
        for (command, keys) in DEFAULT_KEYS {
            if self.used.contains(command) {
                continue;
            }
            for key in keys.iter() {
                if let Some(sequence) = parse_sequence(key) {
                    self.configured.push((sequence, *command));
                }
            }
        }

        let mut keymap = KeyMap::default();
        for view in View::LISTS {
            for command in ANY_VIEW {
                self.register(&mut keymap, *command, view);
            }
        }
        for (command, view) in VIEW_SPECIFIC {
            self.register(&mut keymap, *command, *view);
        }

        keymap.prefixes = keymap
            .bindings
            .keys()
            .filter(|(_, sequence)| sequence.len() > 1)
            .map(|(view, sequence)| (*view, sequence[0]))
            .collect();
        keymap
    }

    // Later registrations overwrite earlier ones for the same view/key pair.
    fn register(&self, keymap: &mut KeyMap, command: Command, view: View) {
        for (sequence, configured) in &self.configured {
            if *configured == command {
                keymap.bindings.insert((view, sequence.clone()), command);
            }
        }
    }
}
