//! Transport state published from the render thread.

use core::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use td_ir::PlaybackMode;

/// Atomics written by the render thread at the end of every cycle and read
/// by the control thread's poll loop.
///
/// f64 values are stored as their bit patterns. Each field is individually
/// consistent; `epoch` is written last with release ordering so a reader
/// that sees a new epoch also sees the fields published with it.
#[derive(Debug, Default)]
pub struct DeckStatus {
    position_bits: AtomicU64,
    length_bits: AtomicU64,
    playing: AtomicBool,
    finished: AtomicBool,
    mode: AtomicU8,
    applied: AtomicU64,
    epoch: AtomicU64,
}

/// A point-in-time copy of a [`DeckStatus`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StatusSnapshot {
    /// Play head in stream seconds.
    pub position: f64,
    /// Stream duration in seconds, 0.0 when nothing is loaded.
    pub length: f64,
    pub playing: bool,
    /// The stream ran out of samples and no loop picked it up.
    pub finished: bool,
    pub mode: PlaybackMode,
    /// Epoch of the most recently applied load.
    pub epoch: u64,
    /// Number of commands the render side has applied so far.
    pub applied: u64,
}

impl DeckStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, snapshot: &StatusSnapshot) {
        self.position_bits
            .store(snapshot.position.to_bits(), Ordering::Relaxed);
        self.length_bits
            .store(snapshot.length.to_bits(), Ordering::Relaxed);
        self.playing.store(snapshot.playing, Ordering::Relaxed);
        self.finished.store(snapshot.finished, Ordering::Relaxed);
        self.mode.store(snapshot.mode.to_u8(), Ordering::Relaxed);
        self.applied.store(snapshot.applied, Ordering::Relaxed);
        self.epoch.store(snapshot.epoch, Ordering::Release);
    }

    pub fn load(&self) -> StatusSnapshot {
        let epoch = self.epoch.load(Ordering::Acquire);
        StatusSnapshot {
            position: f64::from_bits(self.position_bits.load(Ordering::Relaxed)),
            length: f64::from_bits(self.length_bits.load(Ordering::Relaxed)),
            playing: self.playing.load(Ordering::Relaxed),
            finished: self.finished.load(Ordering::Relaxed),
            mode: PlaybackMode::from_u8(self.mode.load(Ordering::Relaxed)),
            epoch,
            applied: self.applied.load(Ordering::Relaxed),
        }
    }

    pub fn position(&self) -> f64 {
        f64::from_bits(self.position_bits.load(Ordering::Relaxed))
    }

    pub fn length(&self) -> f64 {
        f64::from_bits(self.length_bits.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_empty() {
        let status = DeckStatus::new();
        assert_eq!(status.load(), StatusSnapshot::default());
        assert_eq!(status.length(), 0.0);
    }

    #[test]
    fn store_then_load_preserves_fields() {
        let status = DeckStatus::new();
        let snap = StatusSnapshot {
            position: 2.5,
            length: 10.0,
            playing: true,
            finished: false,
            mode: PlaybackMode::AbLoop,
            epoch: 7,
            applied: 12,
        };
        status.store(&snap);
        assert_eq!(status.load(), snap);
        assert_eq!(status.position(), 2.5);
    }
}
