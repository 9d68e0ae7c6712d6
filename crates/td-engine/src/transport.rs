//! Per-deck transport: play head, gain, speed and loop handling.

use alloc::sync::Arc;
use td_ir::{clamp_seconds, AudioBuffer, AudioSource, LoopRegion, PlaybackMode, StreamData};

use crate::command::DeckCommand;
use crate::status::{DeckStatus, StatusSnapshot};

/// Upper bound for the linear gain multiplier.
pub const MAX_GAIN: f32 = 2.0;
/// Slowest playback rate.
pub const MIN_SPEED: f64 = 0.25;
/// Fastest playback rate.
pub const MAX_SPEED: f64 = 4.0;

/// What happened during one render cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Nothing to play: no stream, stopped, or not prepared.
    Silent,
    /// The whole block came from the stream.
    Playing,
    /// The play head passed the A-B region end and jumped to its start.
    LoopedToRegionStart,
    /// The stream finished and whole-stream looping restarted it at 0.0.
    Restarted,
    /// The stream finished; the tail of the block is silence.
    Finished,
}

/// The transport and loop engine of one deck.
///
/// Position is kept in stream seconds so that seeks are exact: after
/// `seek(t)` the position reads back as exactly `t`. Each output frame
/// advances the play head by `speed / output_rate` seconds, which makes
/// timing independent of the stream's native sample rate.
#[derive(Debug)]
pub struct Transport {
    stream: Option<Arc<StreamData>>,
    /// Duration of the loaded stream in seconds
    length: f64,
    /// Play head in stream seconds, within `[0, length]`
    position: f64,
    playing: bool,
    /// Set when the stream ran out of samples
    finished: bool,
    gain: f32,
    speed: f64,
    mode: PlaybackMode,
    region: LoopRegion,
    /// Device rate set by `prepare`
    output_rate: u32,
    block_size: usize,
    prepared: bool,
    /// Epoch of the most recent load
    epoch: u64,
    /// Commands applied since construction
    applied: u64,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    pub fn new() -> Self {
        Self {
            stream: None,
            length: 0.0,
            position: 0.0,
            playing: false,
            finished: false,
            gain: 1.0,
            speed: 1.0,
            mode: PlaybackMode::Normal,
            region: LoopRegion::default(),
            output_rate: 0,
            block_size: 0,
            prepared: false,
            epoch: 0,
            applied: 0,
        }
    }

    // --- Session lifecycle ---

    /// Set the output block size and device rate. Must precede the first
    /// `render` and follow any change of either.
    pub fn prepare(&mut self, block_size: usize, sample_rate: u32) {
        self.block_size = block_size;
        self.output_rate = sample_rate;
        self.prepared = sample_rate > 0;
    }

    /// End the session. Rendering yields silence until the next `prepare`.
    pub fn release(&mut self) {
        self.prepared = false;
    }

    // --- Stream management ---

    /// Swap in a new stream, stopped at 0.0 with the loop region covering
    /// the whole stream. Returns the previous stream so the caller decides
    /// where it gets dropped.
    pub fn load(&mut self, stream: Arc<StreamData>) -> Option<Arc<StreamData>> {
        self.length = stream.duration_secs();
        self.position = 0.0;
        self.playing = false;
        self.finished = false;
        self.region = LoopRegion::whole(self.length);
        self.stream.replace(stream)
    }

    /// Drop the current stream. Returns it for the caller to dispose of.
    pub fn unload(&mut self) -> Option<Arc<StreamData>> {
        self.length = 0.0;
        self.position = 0.0;
        self.playing = false;
        self.finished = false;
        self.region = LoopRegion::default();
        self.stream.take()
    }

    // --- Transport controls ---

    /// Start playback. A no-op without a stream.
    pub fn start(&mut self) {
        if self.stream.is_some() {
            self.playing = true;
            self.finished = false;
        }
    }

    /// Stop playback, keeping the position. Idempotent.
    pub fn stop(&mut self) {
        self.playing = false;
    }

    /// Move the play head, clamped to `[0, length]`.
    pub fn seek(&mut self, seconds: f64) {
        self.position = clamp_seconds(seconds, self.length);
        if self.position < self.length {
            self.finished = false;
        }
    }

    /// Set the linear gain, clamped to `[0, MAX_GAIN]`. Non-finite values
    /// are ignored.
    pub fn set_gain(&mut self, gain: f32) {
        if gain.is_finite() {
            self.gain = gain.clamp(0.0, MAX_GAIN);
        }
    }

    /// Set the playback rate, clamped to `[MIN_SPEED, MAX_SPEED]`.
    /// Non-finite values are ignored.
    pub fn set_speed(&mut self, speed: f64) {
        if speed.is_finite() {
            self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        }
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        self.mode = mode;
    }

    /// Store the A-B region with each boundary clamped to `[0, length]`.
    /// Ordering is not enforced here.
    pub fn set_loop_region(&mut self, region: LoopRegion) {
        self.region = region.clamped(self.length);
    }

    /// Leave A-B mode and reset the region to `[0, length]`.
    pub fn clear_ab_loop(&mut self) {
        self.mode = self.mode.with_ab_loop(false);
        self.region = LoopRegion::whole(self.length);
    }

    /// Apply a queued command. Returns a stream that was swapped out.
    pub fn apply(&mut self, command: DeckCommand) -> Option<Arc<StreamData>> {
        self.applied = self.applied.wrapping_add(1);
        match command {
            DeckCommand::Load { stream, epoch, autoplay } => {
                let previous = self.load(stream);
                self.epoch = epoch;
                if autoplay {
                    self.start();
                }
                return previous;
            }
            DeckCommand::Unload => return self.unload(),
            DeckCommand::Start => self.start(),
            DeckCommand::Stop => self.stop(),
            DeckCommand::Seek(seconds) => self.seek(seconds),
            DeckCommand::SetGain(gain) => self.set_gain(gain),
            DeckCommand::SetSpeed(speed) => self.set_speed(speed),
            DeckCommand::SetMode(mode) => self.set_mode(mode),
            DeckCommand::SetLoopRegion(region) => self.set_loop_region(region),
            DeckCommand::ClearAbLoop => self.clear_ab_loop(),
        }
        None
    }

    // --- Rendering ---

    /// Fill `output` from the stream at the current speed and gain, then run
    /// the loop-boundary check against the advanced position.
    ///
    /// Overwrites the whole block. When the stream runs out mid-block the
    /// remainder is silence. Never allocates.
    pub fn render(&mut self, output: &mut AudioBuffer) -> BlockOutcome {
        let Some(stream) = self.stream.as_deref() else {
            output.silence();
            return BlockOutcome::Silent;
        };
        if !self.prepared || !self.playing {
            output.silence();
            return BlockOutcome::Silent;
        }

        let source_rate = stream.sample_rate() as f64;
        let source_frames = stream.len() as f64;
        let step = self.speed / self.output_rate as f64;
        let frames = output.frames();
        let channels = output.channels();

        let mut produced = frames;
        for frame in 0..frames {
            let source_pos = self.position * source_rate;
            if source_pos >= source_frames {
                produced = frame;
                self.finished = true;
                break;
            }
            for ch in 0..channels {
                output.channel_mut(ch)[frame] = stream.read_interpolated(ch, source_pos) * self.gain;
            }
            self.position += step;
        }

        if self.finished {
            output.silence_from(produced);
            self.position = self.length;
            self.playing = false;
        } else {
            self.position = self.position.min(self.length);
        }

        self.check_loop_boundary()
    }

    /// Loop handling, evaluated once per cycle after the block is filled.
    fn check_loop_boundary(&mut self) -> BlockOutcome {
        match self.mode {
            PlaybackMode::AbLoop
                if self.position > self.region.end
                    || (self.finished && self.position >= self.region.end) =>
            {
                self.position = self.region.start;
                self.finished = false;
                self.playing = true;
                BlockOutcome::LoopedToRegionStart
            }
            PlaybackMode::WholeLoop if self.finished => {
                self.position = 0.0;
                self.finished = false;
                self.playing = true;
                BlockOutcome::Restarted
            }
            _ if self.finished => BlockOutcome::Finished,
            _ => BlockOutcome::Playing,
        }
    }

    /// Write the current state into `status`.
    pub fn publish(&self, status: &DeckStatus) {
        status.store(&self.snapshot());
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            position: self.position,
            length: self.length,
            playing: self.playing,
            finished: self.finished,
            mode: self.mode,
            epoch: self.epoch,
            applied: self.applied,
        }
    }

    // --- Accessors ---

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn loop_region(&self) -> LoopRegion {
        self.region
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }
}
