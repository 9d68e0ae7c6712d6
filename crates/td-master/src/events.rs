//! Notifications surfaced by [`Session::tick`](crate::Session::tick).

use std::fmt;
use std::path::PathBuf;

use td_formats::TrackMetadata;

/// Which of the two decks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeckId {
    A,
    B,
}

impl DeckId {
    pub const ALL: [DeckId; 2] = [DeckId::A, DeckId::B];

    /// Slot in the mixer, 0 or 1.
    pub fn index(self) -> usize {
        match self {
            DeckId::A => 0,
            DeckId::B => 1,
        }
    }
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckId::A => write!(f, "A"),
            DeckId::B => write!(f, "B"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Auto-advance loaded the next playlist entry.
    TrackLoaded {
        deck: DeckId,
        index: usize,
        path: PathBuf,
    },
    /// Auto-advance could not load an entry and skipped it.
    LoadFailed {
        deck: DeckId,
        path: PathBuf,
        reason: String,
    },
    /// The stream ended outside loop mode and there is no next track.
    PlaylistEnded { deck: DeckId },
    /// Tags for the track on `deck` were read.
    MetadataLoaded {
        deck: DeckId,
        metadata: TrackMetadata,
    },
}
