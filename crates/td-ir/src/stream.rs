//! Decoded audio stream data.

use alloc::vec;
use alloc::vec::Vec;

use crate::audio_traits::AudioSource;

/// A fully decoded audio stream held in memory as planar f32.
///
/// Every plane has the same length. Streams are built off the render thread
/// and shared with it behind an `Arc`, so they are immutable once built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamData {
    planes: Vec<Vec<f32>>,
    sample_rate: u32,
    frames: usize,
}

impl StreamData {
    /// Build from per-channel planes. Planes are truncated to the shortest.
    pub fn from_planar(mut planes: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let frames = planes.iter().map(Vec::len).min().unwrap_or(0);
        for plane in &mut planes {
            plane.truncate(frames);
        }
        Self { planes, sample_rate, frames }
    }

    /// Build from interleaved samples with `channels` samples per frame.
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(samples: &[f32], channels: u16, sample_rate: u32) -> Self {
        let chs = channels.max(1) as usize;
        let frames = samples.len() / chs;
        let mut planes = vec![Vec::with_capacity(frames); chs];
        for frame in samples.chunks_exact(chs) {
            for (plane, &s) in planes.iter_mut().zip(frame) {
                plane.push(s);
            }
        }
        Self { planes, sample_rate, frames }
    }

    /// A stream holding `frames` copies of `value` on every channel.
    pub fn constant(channels: u16, frames: usize, sample_rate: u32, value: f32) -> Self {
        Self {
            planes: vec![vec![value; frames]; channels.max(1) as usize],
            sample_rate,
            frames,
        }
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames
    }

    /// Returns true if the stream has no frames.
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Number of channels.
    pub fn num_channels(&self) -> u16 {
        self.planes.len() as u16
    }

    /// One channel's samples.
    pub fn plane(&self, ch: u16) -> &[f32] {
        self.planes.get(ch as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Source channel feeding output channel `ch`. Mono sources feed every
    /// output channel; wider outputs repeat the last source channel.
    fn source_channel(&self, ch: u16) -> usize {
        (ch as usize).min(self.planes.len().saturating_sub(1))
    }

    /// Linearly interpolated read at a fractional frame position.
    ///
    /// Positions at or past the end read as silence; the last frame blends
    /// toward zero.
    pub fn read_interpolated(&self, ch: u16, pos: f64) -> f32 {
        if self.planes.is_empty() || pos < 0.0 {
            return 0.0;
        }
        let base = libm::floor(pos);
        let idx = base as usize;
        if idx >= self.frames {
            return 0.0;
        }
        let frac = (pos - base) as f32;
        let plane = &self.planes[self.source_channel(ch)];
        let a = plane[idx];
        let b = plane.get(idx + 1).copied().unwrap_or(0.0);
        a + (b - a) * frac
    }
}

impl AudioSource for StreamData {
    fn channels(&self) -> u16 {
        self.num_channels()
    }

    fn frames(&self) -> usize {
        self.frames
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_f32(&self, ch: u16, frame: usize) -> f32 {
        if self.planes.is_empty() {
            return 0.0;
        }
        self.planes[self.source_channel(ch)]
            .get(frame)
            .copied()
            .unwrap_or(0.0)
    }
}
