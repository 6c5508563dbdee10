use crate::library::{Playlist, PlaylistCollection, Track};
use fuzzy_matcher::{clangd::ClangdMatcher, FuzzyMatcher};
use id3::TagLike;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "oga", "m4a", "mp4", "aac", "wav"];

/// Every audio file under the music roots, grouped into playlists by
/// directory. Directories that only hold other playlists become folders.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    collection: PlaylistCollection,
    tracks: Vec<Arc<Track>>,
}

#[derive(Debug, Default)]
struct Tags {
    artist: Option<String>,
    title: Option<String>,
    duration: Option<Duration>,
}

impl Catalog {
    pub fn scan(roots: &[PathBuf]) -> Self {
        let mut catalog = Catalog::default();
        for root in roots {
            if !root.is_dir() {
                warn!("Skipping music directory {}: not a directory", root.display());
                continue;
            }
            catalog.scan_root(root);
        }
        info!(
            "Catalog has {} tracks in {} playlists",
            catalog.tracks.len(),
            catalog.collection.len()
        );
        catalog
    }

    pub fn playlists(&self) -> PlaylistCollection {
        self.collection.clone()
    }

    pub fn tracks(&self) -> &[Arc<Track>] {
        &self.tracks
    }

    /// Fuzzy match against "artist title", best score first.
    pub fn search(&self, query: &str) -> Vec<Arc<Track>> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let matcher = ClangdMatcher::default();
        let mut scored: Vec<(i64, &Arc<Track>)> = self
            .tracks
            .iter()
            .filter_map(|track| {
                let haystack = format!("{} {}", track.display_artist(), track.display_title());
                matcher.fuzzy_match(&haystack, query).map(|score| (score, track))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        debug!("Search '{}' matched {} tracks", query, scored.len());
        scored.into_iter().map(|(_, track)| track.clone()).collect()
    }

    pub fn by_artist(&self, artist: &str) -> Vec<Arc<Track>> {
        self.tracks
            .iter()
            .filter(|track| track.artist.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(artist)))
            .cloned()
            .collect()
    }

    fn scan_root(&mut self, root: &Path) {
        let mut dirs: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
        for entry in WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            let path = entry.path();
            if !entry.file_type().is_file() || is_hidden(path) || !is_supported(path) {
                continue;
            }
            if let Some(parent) = path.parent() {
                dirs.entry(parent.to_path_buf()).or_default().push(path.to_path_buf());
            }
        }

        let mut folders = BTreeSet::new();
        for dir in dirs.keys() {
            for ancestor in dir.ancestors().skip(1) {
                if ancestor == root || !ancestor.starts_with(root) {
                    break;
                }
                if !dirs.contains_key(ancestor) {
                    folders.insert(ancestor.to_path_buf());
                }
            }
        }

        let parent_of = |dir: &Path| {
            dir.parent()
                .filter(|parent| folders.contains(*parent))
                .map(|parent| playlist_name(root, parent))
        };

        for folder in &folders {
            let playlist = Playlist::folder(playlist_name(root, folder));
            self.collection.insert(attach(playlist, parent_of(folder)));
        }

        for (dir, files) in &dirs {
            let tracks: Vec<Arc<Track>> = files.iter().map(|file| Arc::new(read_track(file))).collect();
            self.tracks.extend(tracks.iter().cloned());
            let playlist = Playlist::new(playlist_name(root, dir), tracks);
            self.collection.insert(attach(playlist, parent_of(dir)));
        }
    }
}

fn attach(playlist: Playlist, parent: Option<String>) -> Playlist {
    match parent {
        Some(parent) => playlist.with_parent(parent),
        None => playlist,
    }
}

/// Path relative to the root with `/` separators; the root itself is named
/// after its last component.
fn playlist_name(root: &Path, dir: &Path) -> String {
    match dir.strip_prefix(root) {
        Ok(relative) if relative.as_os_str().is_empty() => root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string()),
        Ok(relative) => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => dir.display().to_string(),
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with('.'))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn is_supported(path: &Path) -> bool {
    extension(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Builds a track from tags where the format has them, falling back to the
/// file stem for the title.
pub fn read_track(path: &Path) -> Track {
    let tags = match extension(path).as_deref() {
        Some("mp3") => read_id3(path),
        Some("m4a") | Some("mp4") => read_mp4(path),
        _ => None,
    }
    .unwrap_or_default();

    let mut track = Track::new(path.to_string_lossy().into_owned());
    track.artist = tags.artist;
    track.title = tags
        .title
        .or_else(|| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()));
    track.duration = tags.duration;
    track
}

fn read_id3(path: &Path) -> Option<Tags> {
    let tag = id3::Tag::read_from_path(path)
        .map_err(|e| debug!("No ID3 tag in {}: {}", path.display(), e))
        .ok()?;
    Some(Tags {
        artist: tag.artist().map(|s| s.to_string()),
        title: tag.title().map(|s| s.to_string()),
        duration: tag.duration().map(|ms| Duration::from_millis(ms as u64)),
    })
}

fn read_mp4(path: &Path) -> Option<Tags> {
    let tag = mp4ameta::Tag::read_from_path(path)
        .map_err(|e| debug!("No MP4 metadata in {}: {}", path.display(), e))
        .ok()?;
    Some(Tags {
        artist: tag.artist().map(|s| s.to_string()),
        title: tag.title().map(|s| s.to_string()),
        duration: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"not really audio").unwrap();
    }

    fn library() -> TempDir {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Jazz/Nina Simone - Feeling Good.mp3");
        touch(dir.path(), "Jazz/Take Five.flac");
        touch(dir.path(), "Rock/80s/Africa.ogg");
        touch(dir.path(), "Rock/90s/Zombie.m4a");
        touch(dir.path(), "Rock/90s/cover.jpg");
        touch(dir.path(), "Rock/90s/.hidden.mp3");
        touch(dir.path(), "Empty/notes.txt");
        dir
    }

    #[test]
    fn test_directories_become_playlists_and_folders() {
        let dir = library();
        let catalog = Catalog::scan(&[dir.path().to_path_buf()]);
        let collection = catalog.playlists();

        assert_eq!(collection.names(), ["Jazz", "Rock", "Rock/80s", "Rock/90s"]);
        assert!(collection.get("Rock").unwrap().is_folder());
        assert_eq!(collection.get("Rock/80s").unwrap().parent(), Some("Rock"));
        assert_eq!(collection.get("Jazz").unwrap().parent(), None);
        assert_eq!(collection.get("Jazz").unwrap().len(), 2);
        assert_eq!(collection.get("Rock/90s").unwrap().len(), 1);
        assert_eq!(catalog.tracks().len(), 4);
    }

    #[test]
    fn test_untagged_files_fall_back_to_file_stem() {
        let dir = library();
        let catalog = Catalog::scan(&[dir.path().to_path_buf()]);
        let jazz = catalog.playlists().get("Jazz").cloned().unwrap();

        let first = jazz.track(0).unwrap();
        assert_eq!(first.title.as_deref(), Some("Nina Simone - Feeling Good"));
        assert_eq!(first.display_artist(), "Unknown Artist");
        assert!(first.uri.ends_with("Feeling Good.mp3"));
    }

    #[test]
    fn test_root_with_files_is_named_after_itself() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Music/song.wav");
        let root = dir.path().join("Music");
        let catalog = Catalog::scan(&[root]);
        assert_eq!(catalog.playlists().names(), ["Music"]);
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let catalog = Catalog::scan(&[PathBuf::from("/definitely/not/here")]);
        assert!(catalog.playlists().is_empty());
    }

    #[test]
    fn test_search_and_artist_lookup() {
        let dir = library();
        let mut catalog = Catalog::scan(&[dir.path().to_path_buf()]);
        let feeling = catalog.search("Feeling");
        assert_eq!(feeling.len(), 1);
        assert_eq!(feeling[0].display_title(), "Nina Simone - Feeling Good");
        assert!(catalog.search("   ").is_empty());

        // Tagless files have no artist to match against.
        assert!(catalog.by_artist("Unknown Artist").is_empty());

        let tagged = Arc::new(Track::new("x.mp3").with_artist("Toto").with_title("Africa"));
        catalog.tracks.push(tagged);
        assert_eq!(catalog.by_artist("toto").len(), 1);
    }
}
