//! Multichannel f32 audio block with planar layout.

use alloc::vec;
use alloc::vec::Vec;

/// Maximum number of audio channels per block.
pub const MAX_CHANNELS: u16 = 8;

/// Default number of frames per render cycle.
pub const BLOCK_SIZE: usize = 512;

/// A multichannel f32 audio block in planar layout.
///
/// Data is stored as `channels` contiguous planes of `frames` samples each.
/// `data[ch * frames + frame]` gives the sample for channel `ch` at `frame`.
///
/// The shape is fixed between calls to [`AudioBuffer::resize`], so a block
/// allocated during `prepare` can be reused on every render cycle.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channels: u16,
    frames: usize,
}

impl AudioBuffer {
    /// Create a new silent block with the given dimensions.
    pub fn new(channels: u16, frames: usize) -> Self {
        let channels = channels.min(MAX_CHANNELS);
        Self {
            data: vec![0.0; channels as usize * frames],
            channels,
            frames,
        }
    }

    /// Change the block shape and clear it. Allocates; never call from a
    /// render cycle.
    pub fn resize(&mut self, channels: u16, frames: usize) {
        let channels = channels.min(MAX_CHANNELS);
        self.data.clear();
        self.data.resize(channels as usize * frames, 0.0);
        self.channels = channels;
        self.frames = frames;
    }

    /// Fill all samples with zero.
    pub fn silence(&mut self) {
        self.data.fill(0.0);
    }

    /// Zero every channel from `frame` to the end of the block.
    pub fn silence_from(&mut self, frame: usize) {
        if frame >= self.frames {
            return;
        }
        for ch in 0..self.channels {
            self.channel_mut(ch)[frame..].fill(0.0);
        }
    }

    /// Number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Returns true if the block holds no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read-only access to one channel's sample data.
    pub fn channel(&self, ch: u16) -> &[f32] {
        let start = ch as usize * self.frames;
        &self.data[start..start + self.frames]
    }

    /// Mutable access to one channel's sample data.
    pub fn channel_mut(&mut self, ch: u16) -> &mut [f32] {
        let start = ch as usize * self.frames;
        let len = self.frames;
        &mut self.data[start..start + len]
    }

    /// Sum overlapping channels from `source` into this block.
    ///
    /// Plain addition: no normalisation, no limiting.
    pub fn mix_from(&mut self, source: &AudioBuffer) {
        let chs = self.channels.min(source.channels);
        let frs = self.frames.min(source.frames);
        for ch in 0..chs {
            let dst = &mut self.channel_mut(ch)[..frs];
            let src = &source.channel(ch)[..frs];
            for (d, s) in dst.iter_mut().zip(src) {
                *d += s;
            }
        }
    }

    /// Scale all samples by `gain`.
    pub fn apply_gain(&mut self, gain: f32) {
        for s in &mut self.data {
            *s *= gain;
        }
    }

    /// Write frames `[offset, offset + count)` into an interleaved slice
    /// with `out_channels` samples per frame. Extra output channels are
    /// zero-filled.
    pub fn write_interleaved(&self, offset: usize, count: usize, out: &mut [f32], out_channels: usize) {
        for (i, chunk) in out.chunks_mut(out_channels).take(count).enumerate() {
            let frame = offset + i;
            for (ch, sample) in chunk.iter_mut().enumerate() {
                *sample = if ch < self.channels as usize && frame < self.frames {
                    self.data[ch * self.frames + frame]
                } else {
                    0.0
                };
            }
        }
    }
}
