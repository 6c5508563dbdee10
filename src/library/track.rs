use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A playable unit as handed out by the backend session.
///
/// The core only ever holds `Arc<Track>` references; `uri` is opaque and
/// only meaningful to the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub uri: String,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub duration: Option<Duration>,
    pub available: bool,
}

impl Track {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            artist: None,
            title: None,
            duration: None,
            available: true,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn display_artist(&self) -> &str {
        self.artist.as_deref().unwrap_or("Unknown Artist")
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.uri)
    }

    /// `m:ss`, or `h:mm:ss` for anything an hour or longer.
    pub fn duration_string(&self) -> String {
        match self.duration {
            Some(duration) => {
                let total = duration.as_secs();
                let hours = total / 3600;
                let minutes = (total % 3600) / 60;
                let seconds = total % 60;
                if hours > 0 {
                    format!("{}:{:02}:{:02}", hours, minutes, seconds)
                } else {
                    format!("{}:{:02}", minutes, seconds)
                }
            }
            None => "-:--".to_string(),
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.display_artist(), self.display_title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_falls_back_to_uri() {
        let track = Track::new("file:///music/a.mp3");
        assert_eq!(track.to_string(), "Unknown Artist - file:///music/a.mp3");

        let track = track.with_artist("Low").with_title("Words");
        assert_eq!(track.to_string(), "Low - Words");
    }

    #[test]
    fn test_duration_string() {
        let track = Track::new("a").with_duration(Duration::from_secs(205));
        assert_eq!(track.duration_string(), "3:25");

        let track = Track::new("b").with_duration(Duration::from_secs(3725));
        assert_eq!(track.duration_string(), "1:02:05");

        assert_eq!(Track::new("c").duration_string(), "-:--");
    }
}
