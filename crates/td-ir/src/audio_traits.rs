//! Audio source and render-callback traits.

use crate::audio_buffer::AudioBuffer;

/// Read-only access to decoded sample data at a given position.
pub trait AudioSource {
    /// Number of channels in the source.
    fn channels(&self) -> u16;

    /// Number of frames in the source.
    fn frames(&self) -> usize;

    /// Native sample rate of the source in Hz.
    fn sample_rate(&self) -> u32;

    /// Read a sample at the given channel and frame. Out-of-range reads
    /// return silence.
    fn read_f32(&self, ch: u16, frame: usize) -> f32;

    /// Duration of the source in seconds.
    fn duration_secs(&self) -> f64 {
        crate::timestamp::frames_to_seconds(self.frames() as f64, self.sample_rate())
    }
}

/// The audio-session lifecycle exposed to a device binding.
///
/// `prepare` brackets a session and may allocate. `render` runs once per
/// fixed-size block on the real-time thread and must not block, allocate or
/// fail. `release` ends the session.
pub trait RenderCallback: Send {
    /// (Re)initialise for the given block shape and output rate.
    fn prepare(&mut self, block_size: usize, sample_rate: u32, channels: u16);

    /// Fill `output` completely. Any failure is rendered as silence.
    fn render(&mut self, output: &mut AudioBuffer);

    /// Release session resources. `prepare` must be called again before the
    /// next `render`.
    fn release(&mut self);
}
