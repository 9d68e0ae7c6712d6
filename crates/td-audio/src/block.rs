//! Fixed-size block rendering on top of variable-size device buffers.

use td_ir::{AudioBuffer, RenderCallback};

/// Drives a [`RenderCallback`] one fixed block at a time and copies the
/// result into whatever buffer sizes the device asks for.
///
/// Frames left over from a block are served first on the next request. The
/// callback is released when the adapter is dropped, which happens when the
/// device stream owning it goes away.
pub struct BlockAdapter<C: RenderCallback> {
    callback: C,
    block: AudioBuffer,
    /// Frames of `block` already copied out.
    cursor: usize,
}

impl<C: RenderCallback> BlockAdapter<C> {
    /// Prepare `callback` for the given block shape.
    pub fn new(mut callback: C, block_size: usize, sample_rate: u32, channels: u16) -> Self {
        let block_size = block_size.max(1);
        callback.prepare(block_size, sample_rate, channels);
        let block = AudioBuffer::new(channels, block_size);
        let cursor = block.frames();
        Self { callback, block, cursor }
    }

    /// Fill an interleaved device buffer with `device_channels` samples per
    /// frame. Device channels beyond the block's channel count get silence.
    pub fn fill_interleaved(&mut self, data: &mut [f32], device_channels: usize) {
        if device_channels == 0 {
            return;
        }
        let total = data.len() / device_channels;
        let mut written = 0;

        while written < total {
            if self.cursor >= self.block.frames() {
                self.callback.render(&mut self.block);
                self.cursor = 0;
            }
            let count = (self.block.frames() - self.cursor).min(total - written);
            let out = &mut data[written * device_channels..(written + count) * device_channels];
            self.block
                .write_interleaved(self.cursor, count, out, device_channels);
            self.cursor += count;
            written += count;
        }

        data[total * device_channels..].fill(0.0);
    }

    pub fn callback(&self) -> &C {
        &self.callback
    }

    pub fn callback_mut(&mut self) -> &mut C {
        &mut self.callback
    }
}

impl<C: RenderCallback> Drop for BlockAdapter<C> {
    fn drop(&mut self) {
        self.callback.release();
    }
}
