//! Loop mode and loop region types.

use crate::timestamp::clamp_seconds;

/// How a deck behaves when playback reaches a boundary.
///
/// Whole-stream looping and A-B looping are mutually exclusive, so they are
/// one value rather than two flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlaybackMode {
    /// Play through once and stop at the end.
    #[default]
    Normal,
    /// Restart from 0.0 when the stream finishes.
    WholeLoop,
    /// Jump back to the region start once the region end is passed.
    AbLoop,
}

impl PlaybackMode {
    /// Compact encoding for atomic publication.
    pub const fn to_u8(self) -> u8 {
        match self {
            PlaybackMode::Normal => 0,
            PlaybackMode::WholeLoop => 1,
            PlaybackMode::AbLoop => 2,
        }
    }

    /// Inverse of [`PlaybackMode::to_u8`]; unknown values decode as `Normal`.
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => PlaybackMode::WholeLoop,
            2 => PlaybackMode::AbLoop,
            _ => PlaybackMode::Normal,
        }
    }

    pub fn is_looping(self) -> bool {
        self == PlaybackMode::WholeLoop
    }

    pub fn is_ab_loop(self) -> bool {
        self == PlaybackMode::AbLoop
    }

    /// Mode after switching whole-stream looping on or off. Turning it on
    /// replaces A-B looping; turning it off leaves A-B looping alone.
    pub fn with_looping(self, enable: bool) -> Self {
        match (enable, self) {
            (true, _) => PlaybackMode::WholeLoop,
            (false, PlaybackMode::WholeLoop) => PlaybackMode::Normal,
            (false, other) => other,
        }
    }

    /// Mode after switching A-B looping on or off. Turning it off never
    /// restores a previous whole-stream loop.
    pub fn with_ab_loop(self, enable: bool) -> Self {
        match (enable, self) {
            (true, _) => PlaybackMode::AbLoop,
            (false, PlaybackMode::AbLoop) => PlaybackMode::Normal,
            (false, other) => other,
        }
    }
}

/// A-B loop boundaries in stream seconds.
///
/// Fields are public: an inverted region (`start > end`) is representable and
/// only [`LoopRegion::ordered`] normalises it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LoopRegion {
    pub start: f64,
    pub end: f64,
}

impl LoopRegion {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// The region covering an entire stream of `length` seconds.
    pub fn whole(length: f64) -> Self {
        Self::new(0.0, clamp_seconds(length, length))
    }

    /// Clamp both boundaries into `[0, length]` independently.
    pub fn clamped(self, length: f64) -> Self {
        Self {
            start: clamp_seconds(self.start, length),
            end: clamp_seconds(self.end, length),
        }
    }

    /// Swap the boundaries if the region is inverted.
    pub fn ordered(self) -> Self {
        if self.is_inverted() {
            Self { start: self.end, end: self.start }
        } else {
            self
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    pub fn len(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0.0
    }
}
