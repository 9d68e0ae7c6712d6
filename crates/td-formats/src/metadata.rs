//! Track metadata from embedded tags, with filename fallbacks.

use std::path::Path;

use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::Accessor;

/// Artist shown when a file carries no artist tag.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// What the display shows for the track on a deck.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
}

impl TrackMetadata {
    /// Metadata derived from the path alone.
    pub fn from_path(path: &Path) -> Self {
        Self {
            title: file_stem(path),
            artist: UNKNOWN_ARTIST.to_string(),
            album: None,
        }
    }

    /// `"Artist - Title"`.
    pub fn display_line(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

/// Read tags from `path`. Never fails: missing or unreadable tags fall back
/// to the file stem as title and [`UNKNOWN_ARTIST`] as artist. Empty tag
/// values count as missing.
pub fn read_metadata(path: &Path) -> TrackMetadata {
    let mut meta = TrackMetadata::from_path(path);

    let tagged = match Probe::open(path).and_then(|probe| probe.read()) {
        Ok(tagged) => tagged,
        Err(e) => {
            log::debug!("{}: no readable tags ({e})", path.display());
            return meta;
        }
    };

    let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
        return meta;
    };

    if let Some(title) = non_empty(tag.title().as_deref()) {
        meta.title = title;
    }
    if let Some(artist) = non_empty(tag.artist().as_deref()) {
        meta.artist = artist;
    }
    meta.album = non_empty(tag.album().as_deref());
    meta
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
