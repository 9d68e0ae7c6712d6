//! Ordered file queue with a play cursor.

use std::path::{Path, PathBuf};

/// Files in insertion order plus the index of the one on the deck.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    entries: Vec<PathBuf>,
    current: Option<usize>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append files in the given order. Returns true when the playlist was
    /// empty before and is not now.
    pub fn add<I>(&mut self, files: I) -> bool
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let was_empty = self.entries.is_empty();
        self.entries.extend(files);
        was_empty && !self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Path> {
        self.entries.get(index).map(PathBuf::as_path)
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the loaded entry; `None` until something from the list has
    /// been loaded.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Move the cursor. Returns false (cursor unchanged) when out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.entries.len() {
            self.current = Some(index);
            true
        } else {
            false
        }
    }

    /// The entry after `from`, if any.
    pub fn index_after(&self, from: usize) -> Option<usize> {
        let next = from.checked_add(1)?;
        (next < self.entries.len()).then_some(next)
    }

    /// The entry after the cursor, if any.
    pub fn next_index(&self) -> Option<usize> {
        self.index_after(self.current?)
    }
}
